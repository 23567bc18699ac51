//! Datasets: paired input/output rows, split into training, validation,
//! and test partitions, with random batch sampling.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{Error, Result};
use crate::values::{InputSet, OutputSet};

/// Paired input and output rows; the row counts always match.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisedInOutSet {
    input: InputSet,
    output: OutputSet,
}

impl SupervisedInOutSet {
    pub fn new(input: InputSet, output: OutputSet) -> Result<Self> {
        if input.set_count() != output.set_count() {
            return Err(Error::InvalidShape(format!(
                "input has {} examples but output has {}",
                input.set_count(),
                output.set_count()
            )));
        }
        Ok(Self { input, output })
    }

    pub fn input_set(&self) -> &InputSet {
        &self.input
    }

    pub fn output_set(&self) -> &OutputSet {
        &self.output
    }

    /// Number of paired examples.
    pub fn size(&self) -> usize {
        self.input.set_count()
    }

    pub fn input_size(&self) -> usize {
        self.input.input_count()
    }

    pub fn output_size(&self) -> usize {
        self.output.output_count()
    }

    /// A random subset of `size` examples, drawn without replacement.
    ///
    /// Asking for the full set returns it as-is. Smaller batches gather
    /// value and mixer rows together, so partial-label masks survive
    /// sampling.
    pub fn randomized_batch(&self, size: usize, rng: &mut impl Rng) -> Result<SupervisedInOutSet> {
        if size > self.size() {
            return Err(Error::InvalidConfig(format!(
                "batch size {size} exceeds the set size {}",
                self.size()
            )));
        }
        if size == self.size() {
            return Ok(self.clone());
        }

        let mut indices: Vec<usize> = (0..self.size()).collect();
        indices.shuffle(rng);
        indices.truncate(size);

        Ok(Self {
            input: InputSet::new(self.input.values().gather_rows(&indices)),
            output: self.output.gather_rows(&indices),
        })
    }

    fn slice_rows(&self, from: usize, to: usize) -> Self {
        Self {
            input: InputSet::new(self.input.values().slice_rows(from, to)),
            output: self.output.slice_rows(from, to),
        }
    }
}

/// The partition a learner trains on.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    set: SupervisedInOutSet,
}

impl TrainingSet {
    pub fn new(set: SupervisedInOutSet) -> Self {
        Self { set }
    }

    pub fn inner(&self) -> &SupervisedInOutSet {
        &self.set
    }

    pub fn size(&self) -> usize {
        self.set.size()
    }
}

/// The partition held out for model selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationSet {
    set: SupervisedInOutSet,
}

impl ValidationSet {
    pub fn new(set: SupervisedInOutSet) -> Self {
        Self { set }
    }

    pub fn inner(&self) -> &SupervisedInOutSet {
        &self.set
    }

    pub fn size(&self) -> usize {
        self.set.size()
    }
}

/// The partition held out for final evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSet {
    set: SupervisedInOutSet,
}

impl TestSet {
    pub fn new(set: SupervisedInOutSet) -> Self {
        Self { set }
    }

    pub fn inner(&self) -> &SupervisedInOutSet {
        &self.set
    }

    pub fn size(&self) -> usize {
        self.set.size()
    }
}

/// What a learner needs from its data source.
pub trait DataSet {
    fn training_set(&self) -> &TrainingSet;
    fn validation_set(&self) -> &ValidationSet;
    fn test_set(&self) -> &TestSet;
    fn input_size(&self) -> usize;
    fn output_size(&self) -> usize;
}

/// An in-memory dataset, shuffled once and split by fractional sizes at
/// construction.
///
/// Rows are shuffled jointly (inputs, outputs, and mixers stay paired),
/// then dealt out as training, test, and validation slices in that order.
/// A zero-sized test or validation fraction aliases the training data so
/// the error surface stays usable.
#[derive(Debug, Clone)]
pub struct StaticDataSet {
    training: TrainingSet,
    validation: ValidationSet,
    test: TestSet,
    input_size: usize,
    output_size: usize,
    data_count: usize,
}

impl StaticDataSet {
    /// Splits with the default 20% validation and 20% test fractions.
    pub fn new(input: InputSet, output: OutputSet, seed: u64) -> Result<Self> {
        Self::with_split(input, output, 0.2, 0.2, seed)
    }

    /// Splits with explicit validation and test fractions in `[0, 1)`.
    pub fn with_split(
        input: InputSet,
        output: OutputSet,
        validation_fraction: f64,
        test_fraction: f64,
        seed: u64,
    ) -> Result<Self> {
        use rand::SeedableRng;

        if input.set_count() != output.set_count() {
            return Err(Error::InvalidShape(format!(
                "input has {} examples but output has {}",
                input.set_count(),
                output.set_count()
            )));
        }
        for (name, fraction) in [
            ("validation fraction", validation_fraction),
            ("test fraction", test_fraction),
        ] {
            if !(fraction.is_finite() && (0.0..1.0).contains(&fraction)) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must lie in [0, 1), got {fraction}"
                )));
            }
        }

        let count = input.set_count();
        let validation_size = (count as f64 * validation_fraction) as usize;
        let test_size = (count as f64 * test_fraction) as usize;
        if validation_size + test_size >= count {
            return Err(Error::InvalidConfig(
                "split leaves no training examples".into(),
            ));
        }
        let training_size = count - validation_size - test_size;

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..count).collect();
        indices.shuffle(&mut rng);

        let shuffled = SupervisedInOutSet {
            input: InputSet::new(input.values().gather_rows(&indices)),
            output: output.gather_rows(&indices),
        };

        let input_size = shuffled.input_size();
        let output_size = shuffled.output_size();

        let training = TrainingSet::new(shuffled.slice_rows(0, training_size));
        let test = if test_size > 0 {
            TestSet::new(shuffled.slice_rows(training_size, training_size + test_size))
        } else {
            TestSet::new(training.inner().clone())
        };
        let validation = if validation_size > 0 {
            ValidationSet::new(
                shuffled.slice_rows(training_size + test_size, training_size + test_size + validation_size),
            )
        } else {
            ValidationSet::new(training.inner().clone())
        };

        Ok(Self {
            training,
            validation,
            test,
            input_size,
            output_size,
            data_count: count,
        })
    }

    /// Total number of examples before splitting.
    pub fn data_size(&self) -> usize {
        self.data_count
    }
}

impl DataSet for StaticDataSet {
    fn training_set(&self) -> &TrainingSet {
        &self.training
    }

    fn validation_set(&self) -> &ValidationSet {
        &self.validation
    }

    fn test_set(&self) -> &TestSet {
        &self.test
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }
}
