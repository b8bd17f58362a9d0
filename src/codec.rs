//! Binary persistence of a network's parameters.
//!
//! The layout is a flat sequence of little endian fields with no padding:
//!
//! | field                  | type                          |
//! |------------------------|-------------------------------|
//! | completed epochs       | `i32`                         |
//! | input, hidden, output  | `i32` × 3                     |
//! | `W1`, row major        | `f32` × hidden × input        |
//! | `W2`, row major        | `f32` × output × hidden       |
//! | `b1`                   | `f32` × hidden                |
//! | `b2`                   | `f32` × output                |

use crate::dataset;
use crate::error::{Error, Result};
use crate::network::Network;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{error, info};
use ndarray::{ArrayView1, ArrayView2};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Size in bytes of the epoch and shape header.
const HEADER_LEN: usize = 4 * 4;

/// Returns the encoded size in bytes of a network with the given shape.
fn encoded_len(input: usize, hidden: usize, output: usize) -> usize {
    HEADER_LEN + 4 * (hidden * input + output * hidden + hidden + output)
}

fn to_i32(value: usize, what: &str) -> io::Result<i32> {
    i32::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{what} {value} does not fit the file format"),
        )
    })
}

/// Writes every parameter of `network`, plus its epoch count, to `writer`.
pub fn write_network<W: Write>(network: &Network, writer: &mut W) -> io::Result<()> {
    let (input, hidden, output) = network.shape();
    let epoch = i32::try_from(network.epoch()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "epoch count does not fit the file format")
    })?;

    writer.write_i32::<LittleEndian>(epoch)?;
    writer.write_i32::<LittleEndian>(to_i32(input, "input size")?)?;
    writer.write_i32::<LittleEndian>(to_i32(hidden, "hidden size")?)?;
    writer.write_i32::<LittleEndian>(to_i32(output, "output size")?)?;

    let (w1, w2, b1, b2) = (network.w1(), network.w2(), network.b1(), network.b2());
    for &v in w1.iter().chain(w2.iter()).chain(b1.iter()).chain(b2.iter()) {
        writer.write_f32::<LittleEndian>(v)?;
    }
    Ok(())
}

fn read_floats<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<f32>> {
    let mut values = vec![0.0; len];
    reader.read_f32_into::<LittleEndian>(&mut values)?;
    Ok(values)
}

fn invalid_data<E>(err: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, err)
}

/// Reads a network written by [`write_network`] into `network`.
///
/// The stored shape must equal the shape of `network`. Nothing is modified
/// unless the whole record was read successfully.
pub fn read_network<R: Read>(network: &mut Network, reader: &mut R) -> Result<()> {
    let epoch = reader.read_i32::<LittleEndian>()?;
    let found = (
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
    );

    let expected = network.shape();
    let (input, hidden, output) = expected;
    if found.0 as i64 != input as i64
        || found.1 as i64 != hidden as i64
        || found.2 as i64 != output as i64
    {
        return Err(Error::ShapeMismatch { expected, found });
    }
    let epoch = u32::try_from(epoch)
        .map_err(|_| invalid_data(format!("negative epoch count {epoch}")))?;

    let w1 = read_floats(reader, hidden * input)?;
    let w2 = read_floats(reader, output * hidden)?;
    let b1 = read_floats(reader, hidden)?;
    let b2 = read_floats(reader, output)?;

    let w1 = ArrayView2::from_shape((hidden, input), &w1).map_err(invalid_data)?;
    let w2 = ArrayView2::from_shape((output, hidden), &w2).map_err(invalid_data)?;

    let (hidden_layer, output_layer) = network.layers_mut();
    hidden_layer.assign(w1, ArrayView1::from(&b1));
    output_layer.assign(w2, ArrayView1::from(&b2));
    network.set_epoch(epoch);
    Ok(())
}

impl Network {
    /// Saves the network to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| {
            error!("Cannot open path: {}: {source}", path.display());
            Error::FileUnavailable {
                path: path.to_owned(),
                source,
            }
        })?;

        let (input, hidden, output) = self.shape();
        let mut writer = BufWriter::with_capacity(encoded_len(input, hidden, output), file);
        write_network(self, &mut writer)
            .and_then(|()| writer.flush())
            .map_err(|err| {
                error!("Failed to save network to {}: {err}", path.display());
                Error::Io(err)
            })?;

        info!("Neural network saved in: {}", path.display());
        Ok(())
    }

    /// Loads parameters and epoch count from `path`.
    ///
    /// On any error the network is left exactly as it was.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            error!("Could not find file: {}", path.display());
            return Err(Error::FileMissing {
                path: path.to_owned(),
            });
        }

        let file = File::open(path).map_err(|source| {
            error!("Cannot open path: {}: {source}", path.display());
            Error::FileUnreadable {
                path: path.to_owned(),
                source,
            }
        })?;

        read_network(self, &mut BufReader::new(file))
            .map_err(dataset::read_error(path))
            .map_err(|err| {
                error!("Failed to load network from {}: {err}", path.display());
                err
            })?;

        info!("Neural network loaded from: {}", path.display());
        info!("Loaded neural network currently has {} epochs", self.epoch());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainer::{Checkpoint, Logging, Trainer};
    use rand::{rngs::StdRng, SeedableRng};
    use std::path::PathBuf;

    fn fresh(seed: u64) -> Network {
        Network::with_rng(4, 3, 2, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    fn trained() -> Network {
        let mut network = fresh(1);
        Trainer::new()
            .epochs(7)
            .learning_rate(0.5)
            .logging(Logging::Silent)
            .checkpoint(Checkpoint::Disabled)
            .train(
                &mut network,
                &[[1.0f32, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]],
                &[[1.0f32, 0.0], [0.0, 1.0]],
            )
            .unwrap();
        network
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("digitnet-codec-{name}-{}", std::process::id()))
    }

    fn assert_same_params(a: &Network, b: &Network) {
        assert_eq!(a.epoch(), b.epoch());
        assert_eq!(a.w1(), b.w1());
        assert_eq!(a.w2(), b.w2());
        assert_eq!(a.b1(), b.b1());
        assert_eq!(a.b2(), b.b2());
    }

    #[test]
    fn layout() {
        let network = trained();
        let mut buf = Vec::new();
        write_network(&network, &mut buf).unwrap();

        assert_eq!(buf.len(), encoded_len(4, 3, 2));
        assert_eq!(&buf[..4], &7i32.to_le_bytes());
        assert_eq!(&buf[4..8], &4i32.to_le_bytes());
        assert_eq!(&buf[8..12], &3i32.to_le_bytes());
        assert_eq!(&buf[12..16], &2i32.to_le_bytes());
        // W1[0][1] follows W1[0][0].
        assert_eq!(&buf[20..24], &network.w1()[[0, 1]].to_le_bytes());
        // b2 closes the record.
        assert_eq!(&buf[buf.len() - 4..], &network.b2()[1].to_le_bytes());
    }

    #[test]
    fn restores_identical_parameters() {
        let network = trained();
        let mut buf = Vec::new();
        write_network(&network, &mut buf).unwrap();

        let mut restored = fresh(2);
        read_network(&mut restored, &mut buf.as_slice()).unwrap();
        assert_same_params(&network, &restored);
    }

    #[test]
    fn save_then_load_file() {
        let path = temp_path("roundtrip");
        let network = trained();
        network.save(&path).unwrap();

        let mut restored = fresh(3);
        restored.load(&path).unwrap();
        assert_same_params(&network, &restored);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn shape_mismatch_leaves_network_untouched() {
        let other = Network::with_rng(4, 5, 2, &mut StdRng::seed_from_u64(4)).unwrap();
        let mut buf = Vec::new();
        write_network(&other, &mut buf).unwrap();

        let mut live = fresh(5);
        let before = live.clone();
        let err = read_network(&mut live, &mut buf.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch {
                expected: (4, 3, 2),
                found: (4, 5, 2)
            }
        ));
        assert_same_params(&before, &live);
    }

    #[test]
    fn missing_file() {
        let mut live = fresh(6);
        let before = live.clone();
        let err = live.load(temp_path("does-not-exist")).unwrap_err();
        assert!(matches!(err, Error::FileMissing { .. }));
        assert_same_params(&before, &live);
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let path = temp_path("truncated");
        let mut buf = Vec::new();
        write_network(&trained(), &mut buf).unwrap();
        std::fs::write(&path, &buf[..buf.len() - 3]).unwrap();

        let mut live = fresh(7);
        let before = live.clone();
        let err = live.load(&path).unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
        assert_same_params(&before, &live);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn directory_is_unreadable() {
        let dir = temp_path("directory");
        std::fs::create_dir_all(&dir).unwrap();

        let mut live = fresh(11);
        let before = live.clone();
        let err = live.load(&dir).unwrap_err();
        assert!(matches!(err, Error::FileUnreadable { .. }));
        assert_same_params(&before, &live);
        std::fs::remove_dir(&dir).unwrap();
    }

    #[test]
    fn negative_epoch_is_rejected() {
        let mut buf = Vec::new();
        write_network(&fresh(8), &mut buf).unwrap();
        buf[..4].copy_from_slice(&(-1i32).to_le_bytes());

        let mut live = fresh(9);
        assert!(matches!(
            read_network(&mut live, &mut buf.as_slice()),
            Err(Error::Io(_))
        ));
        assert_eq!(live.epoch(), 0);
    }

    #[test]
    fn unwritable_destination() {
        let path = temp_path("no-such-dir").join("network");
        let err = fresh(10).save(&path).unwrap_err();
        assert!(matches!(err, Error::FileUnavailable { .. }));
    }
}
