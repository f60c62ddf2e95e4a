//! Labeled image sets and their CSV loader
//!
//! Each record is a line `label,p_0,p_1,...,p_{N-1}` where every `p_i` is a
//! pixel intensity from 0 to 255. Pixels are normalized into [0,1] and packed
//! into a `1 x N` matrix.

use log::debug;
use rand::Rng;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::{error, fmt, iter, slice};

use crate::config::DEFAULT_INPUT_FEATURES;
use crate::feedforward::{Matrix, MatrixError, SizeMismatch};

/// Images paired with their labels. `images[i]` is labeled `labels[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    images: Vec<Matrix>,
    labels: Vec<usize>,
}

impl Samples {
    /// # Returns
    /// * `Err(DataError::LabelCount)` if `images` and `labels` differ in length;
    /// * `Err(DataError::BadImage)` if some image isn't a row vector of the same
    /// width as the first one;
    /// * `Ok(Samples)` otherwise.
    pub fn new(images: Vec<Matrix>, labels: Vec<usize>) -> Result<Samples, DataError> {
        if images.len() != labels.len() {
            return Err(DataError::LabelCount(SizeMismatch {
                expected: images.len(),
                got: labels.len(),
            }));
        }
        if let Some(first) = images.first() {
            let width = first.cols();
            if let Some((index, image)) = images
                .iter()
                .enumerate()
                .find(|(_, image)| image.shape() != (1, width))
            {
                return Err(DataError::BadImage {
                    index,
                    expected: (1, width),
                    got: image.shape(),
                });
            }
        }
        Ok(Samples { images, labels })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Width of every image, 0 for an empty set.
    pub fn feature_count(&self) -> usize {
        self.images.first().map_or(0, |image| image.cols())
    }

    pub fn images(&self) -> &[Matrix] {
        &self.images
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Matrix, usize)> {
        self.images.iter().zip(self.labels.iter().copied())
    }

    /// Consecutive `(images, labels)` slices of `batch_size` samples.
    /// The last one is shorter when `batch_size` doesn't divide `len()`.
    ///
    /// # Panics
    /// If `batch_size` is zero.
    pub fn batches(
        &self,
        batch_size: usize,
    ) -> iter::Zip<slice::Chunks<'_, Matrix>, slice::Chunks<'_, usize>> {
        self.images
            .chunks(batch_size)
            .zip(self.labels.chunks(batch_size))
    }

    /// Uniformly permutes samples, moving each label together with its image.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let n = self.images.len();
        for i in 0..n {
            let j = rng.gen_range(i..n);
            self.images.swap(i, j);
            self.labels.swap(i, j);
        }
    }

    pub fn into_parts(self) -> (Vec<Matrix>, Vec<usize>) {
        (self.images, self.labels)
    }

    /// Reads records from `reader`, see `LoadOptions`.
    ///
    /// # Examples
    /// ```
    /// # use digitnet::data::{LoadOptions, Samples};
    /// let csv = "3,0,255\n7,51,102\n";
    /// let options = LoadOptions { pixels: 2, ..LoadOptions::default() };
    /// let samples = Samples::from_reader(csv.as_bytes(), &options).unwrap();
    /// assert_eq!(samples.labels(), &[3, 7]);
    /// assert_eq!(samples.images()[0].as_slice(), &[0.0, 1.0]);
    /// ```
    pub fn from_reader<R: BufRead>(reader: R, options: &LoadOptions) -> Result<Samples, DataError> {
        let mut images = Vec::new();
        let mut labels = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            if options.max_records.map_or(false, |max| labels.len() >= max) {
                break;
            }

            let line = line?;
            if (index == 0 && options.has_header) || line.trim().is_empty() {
                continue;
            }

            let (label, image) = parse_record(&line, options.pixels).map_err(|reason| {
                DataError::MalformedRecord {
                    line: index + 1,
                    reason,
                }
            })?;
            labels.push(label);
            images.push(image);
        }

        debug!("loaded {} records of {} pixels", labels.len(), options.pixels);
        Samples::new(images, labels)
    }
}

/// CSV loading parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Expected pixel values per record.
    pub pixels: usize,
    /// Stop after this many records.
    pub max_records: Option<usize>,
    /// Skip the first line.
    pub has_header: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            pixels: DEFAULT_INPUT_FEATURES,
            max_records: None,
            has_header: false,
        }
    }
}

/// Parses one `label,p_0,...,p_{N-1}` record.
///
/// # Returns
/// * `Ok((label, image))` with `image` of shape `1 x pixels`;
/// * `Err(RecordError)` describing the first bad field otherwise.
pub fn parse_record(line: &str, pixels: usize) -> Result<(usize, Matrix), RecordError> {
    let mut fields = line.trim().split(',');

    let label_field = fields.next().unwrap_or("").trim();
    let label = label_field
        .parse::<usize>()
        .map_err(|_| RecordError::BadLabel(label_field.to_owned()))?;

    let mut values = Vec::with_capacity(pixels);
    for (index, field) in fields.enumerate() {
        let field = field.trim();
        let intensity = field.parse::<u8>().map_err(|_| RecordError::BadPixel {
            index,
            value: field.to_owned(),
        })?;
        values.push(f64::from(intensity) / 255.0);
    }

    if values.len() != pixels {
        return Err(RecordError::PixelCount(SizeMismatch {
            expected: pixels,
            got: values.len(),
        }));
    }

    let image = Matrix::row_vector(values).map_err(RecordError::Image)?;
    Ok((label, image))
}

/// Loads samples from a CSV file at `path`.
pub fn load_csv<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Samples, DataError> {
    let file = File::open(path)?;
    Samples::from_reader(BufReader::new(file), options)
}

/// Error structure for a single record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    BadLabel(String),
    BadPixel { index: usize, value: String },
    PixelCount(SizeMismatch),
    /// Pixel values don't form a valid image, e.g. a record with no pixels.
    Image(MatrixError),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            RecordError::BadLabel(value) => write!(f, "label {:?} is not a class id", value),
            RecordError::BadPixel { index, value } => write!(
                f,
                "pixel {} is {:?}, expected an integer from 0 to 255",
                index, value
            ),
            RecordError::PixelCount(SizeMismatch { expected, got }) => {
                write!(f, "expected {} pixels, but got {}", expected, got)
            }
            RecordError::Image(err) => write!(f, "{}", err),
        }
    }
}

/// Error structure for loading `Samples`
#[derive(Debug)]
pub enum DataError {
    Io(io::Error),
    /// `line` is 1-based.
    MalformedRecord { line: usize, reason: RecordError },
    LabelCount(SizeMismatch),
    BadImage {
        index: usize,
        expected: (usize, usize),
        got: (usize, usize),
    },
}

impl From<io::Error> for DataError {
    fn from(err: io::Error) -> Self {
        DataError::Io(err)
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            DataError::Io(err) => write!(f, "Can't read samples: {}", err),
            DataError::MalformedRecord { line, reason } => {
                write!(f, "Malformed record on line {}: {}!", line, reason)
            }
            DataError::LabelCount(SizeMismatch { expected, got }) => {
                write!(f, "Expected {} label(s), but got {}!", expected, got)
            }
            DataError::BadImage {
                index,
                expected,
                got,
            } => write!(
                f,
                "Expected image {} to be {}x{}, but got {}x{}!",
                index, expected.0, expected.1, got.0, got.1
            ),
        }
    }
}

impl error::Error for DataError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DataError::Io(err) => Some(err),
            _ => None,
        }
    }
}
