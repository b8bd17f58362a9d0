//! Loading labelled digit images.
//!
//! Two sources are supported: the [IDX](http://yann.lecun.com/exdb/mnist/)
//! files of the MNIST distribution, and an append-only store of samples
//! drawn and labelled by hand.

use crate::error::{Error, Result};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{info, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic number opening an IDX image file.
pub const IMAGES_MAGIC: u32 = 0x0803;

/// Magic number opening an IDX label file.
pub const LABELS_MAGIC: u32 = 0x0801;

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|source| Error::FileUnreadable {
        path: path.to_owned(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Attributes a read failure to the file at `path`: short or malformed data
/// is `Corrupt`, anything else means the file could not be read at all.
pub(crate) fn read_error(path: &Path) -> impl FnOnce(Error) -> Error + '_ {
    move |err| match err {
        Error::Io(err)
            if matches!(
                err.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
            ) =>
        {
            Error::Corrupt {
                path: path.to_owned(),
                reason: err.to_string(),
            }
        }
        Error::Io(source) => Error::FileUnreadable {
            path: path.to_owned(),
            source,
        },
        err => err,
    }
}

/// Reads exactly `len` bytes. The buffer only grows as data arrives, so a
/// header announcing more than the file holds fails with `UnexpectedEof`
/// instead of allocating up front.
fn read_bytes<R: Read>(reader: &mut R, len: u64) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut bytes)?;
    if (bytes.len() as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {len} bytes, found {}", bytes.len()),
        ));
    }
    Ok(bytes)
}

fn check_magic<R: Read>(reader: &mut R, expected: u32) -> Result<()> {
    let found = reader.read_u32::<BigEndian>()?;
    if found != expected {
        return Err(Error::BadMagic { expected, found });
    }
    Ok(())
}

/// Reads an IDX image file, scaling every pixel into `[0, 1]`.
pub fn read_images<R: Read>(reader: &mut R) -> Result<Vec<Vec<f32>>> {
    check_magic(reader, IMAGES_MAGIC)?;
    let count = reader.read_u32::<BigEndian>()? as usize;
    let rows = reader.read_u32::<BigEndian>()? as usize;
    let cols = reader.read_u32::<BigEndian>()? as usize;

    let len = rows
        .checked_mul(cols)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "image size overflows"))?;

    let mut images = Vec::new();
    for _ in 0..count {
        let pixels = read_bytes(reader, len as u64)?;
        images.push(pixels.iter().map(|&p| p as f32 / 255.0).collect());
    }
    Ok(images)
}

/// Reads an IDX label file.
pub fn read_labels<R: Read>(reader: &mut R) -> Result<Vec<usize>> {
    check_magic(reader, LABELS_MAGIC)?;
    let count = reader.read_u32::<BigEndian>()?;

    let labels = read_bytes(reader, u64::from(count))?;
    Ok(labels.into_iter().map(usize::from).collect())
}

/// Loads an IDX image file from `path`.
pub fn load_images<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<f32>>> {
    let path = path.as_ref();
    read_images(&mut open(path)?).map_err(read_error(path))
}

/// Loads an IDX label file from `path`.
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<usize>> {
    let path = path.as_ref();
    read_labels(&mut open(path)?).map_err(read_error(path))
}

/// Returns a vector of `classes` zeros with a one at `label`.
pub fn one_hot(label: usize, classes: usize) -> Result<Vec<f32>> {
    if label >= classes {
        return Err(Error::IndexOutOfRange {
            index: label,
            len: classes,
        });
    }
    let mut target = vec![0.0; classes];
    target[label] = 1.0;
    Ok(target)
}

/// Inputs paired with their labels and one-hot targets.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    inputs: Vec<Vec<f32>>,
    labels: Vec<usize>,
    targets: Vec<Vec<f32>>,
    classes: usize,
}

impl Dataset {
    /// Pairs `inputs` with `labels`, encoding each label over `classes`
    /// outputs.
    pub fn new(inputs: Vec<Vec<f32>>, labels: Vec<usize>, classes: usize) -> Result<Self> {
        if inputs.len() != labels.len() {
            return Err(Error::SizeMismatch {
                what: "label set",
                got: labels.len(),
                expected: inputs.len(),
            });
        }
        let targets = labels
            .iter()
            .map(|&label| one_hot(label, classes))
            .collect::<Result<_>>()?;
        Ok(Dataset {
            inputs,
            labels,
            targets,
            classes,
        })
    }

    /// Loads a pair of IDX image and label files.
    pub fn from_idx<P, Q>(images: P, labels: Q, classes: usize) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let dataset = Dataset::new(load_images(&images)?, load_labels(&labels)?, classes)?;
        info!(
            "Loaded {} samples from {}",
            dataset.len(),
            images.as_ref().display()
        );
        Ok(dataset)
    }

    /// Builds a dataset from hand labelled samples.
    pub fn from_samples(samples: Vec<(Vec<f32>, usize)>, classes: usize) -> Result<Self> {
        let (inputs, labels) = samples.into_iter().unzip();
        Dataset::new(inputs, labels, classes)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    pub fn inputs(&self) -> &[Vec<f32>] {
        &self.inputs
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn targets(&self) -> &[Vec<f32>] {
        &self.targets
    }
}

/// Appends one labelled sample to the store at `path`, creating it if
/// needed.
///
/// Each record is `i32 label`, `i32 pixel count`, then the pixels as `f32`,
/// all little endian.
pub fn append_sample<P: AsRef<Path>>(path: P, pixels: &[f32], label: usize) -> Result<()> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::FileUnavailable {
            path: path.to_owned(),
            source,
        })?;

    let mut writer = BufWriter::new(file);
    write_sample(&mut writer, pixels, label)?;
    writer.flush()?;
    Ok(())
}

fn write_sample<W: Write>(writer: &mut W, pixels: &[f32], label: usize) -> io::Result<()> {
    let invalid = |what: &str| io::Error::new(io::ErrorKind::InvalidInput, what);
    let label = i32::try_from(label).map_err(|_| invalid("label out of range"))?;
    let count = i32::try_from(pixels.len()).map_err(|_| invalid("too many pixels"))?;

    writer.write_i32::<LittleEndian>(label)?;
    writer.write_i32::<LittleEndian>(count)?;
    for &p in pixels {
        writer.write_f32::<LittleEndian>(p)?;
    }
    Ok(())
}

/// Reads every record of a sample store.
pub fn read_samples<R: Read>(reader: &mut R) -> Result<Vec<(Vec<f32>, usize)>> {
    let mut samples = Vec::new();
    loop {
        let label = match reader.read_i32::<LittleEndian>() {
            Ok(label) => label,
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err.into()),
        };
        let count = reader.read_i32::<LittleEndian>()?;
        let (label, count) = match (usize::try_from(label), usize::try_from(count)) {
            (Ok(label), Ok(count)) => (label, count),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("negative label {label} or pixel count {count}"),
                )
                .into())
            }
        };

        let bytes = read_bytes(reader, 4 * count as u64)?;
        let mut pixels = vec![0.0; count];
        LittleEndian::read_f32_into(&bytes, &mut pixels);
        samples.push((pixels, label));
    }
    Ok(samples)
}

/// Loads the sample store at `path`. A store that does not exist yet holds
/// no samples.
pub fn load_samples<P: AsRef<Path>>(path: P) -> Result<Vec<(Vec<f32>, usize)>> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("No sample store found at {}", path.display());
        return Ok(Vec::new());
    }
    let samples = read_samples(&mut open(path)?).map_err(read_error(path))?;
    info!("Loaded {} custom samples from {}", samples.len(), path.display());
    Ok(samples)
}
