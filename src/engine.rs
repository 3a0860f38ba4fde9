/*!
  The rolling trimmed-mean engine. An `Engine` holds the five trim parameters and the samples of
  the current epoch. An epoch ends whenever the window is reset, either explicitly or because a
  parameter changed value, and all per-epoch state lives in a `Window` that is replaced wholesale
  at that point, so a half-cleared window cannot be observed.

  The window is kept twice: once in arrival order, to know which sample to evict, and once in
  ascending order, to find the values to trim. Insertion and eviction in the sorted copy are a
  binary search plus a shift, linear in the window size.
*/

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

use log::debug;
use prettytable::{format as TableFormat, Table};

/// Upper bound on the capacity reserved up front for a new window.
const MAX_PREALLOCATED_SAMPLES: usize = 4096;

/// The trim parameters. All zero by default, which never produces an average.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Debug)]
pub struct TrimConfig {
  /// Number of most recent samples averaged over. Zero disables averaging.
  pub window_size : u32,
  pub lower_abs   : u8,
  pub upper_abs   : u8,
  /// Percent of `window_size`, rounded up.
  pub lower_prop  : u8,
  pub upper_prop  : u8,
}

impl TrimConfig {
  /**
    The number of values trimmed from the bottom and from the top of a full window. Each is the
    larger of the absolute count and the rounded-up percentage of the window size.
  */
  pub fn trims(&self) -> (u64, u64) {
    let n = self.window_size as u64;
    let low  = std::cmp::max(self.lower_abs as u64, proportional_trim(self.lower_prop, n));
    let high = std::cmp::max(self.upper_abs as u64, proportional_trim(self.upper_prop, n));
    (low, high)
  }
}

// ceil(percent * n / 100) without going through floating point.
fn proportional_trim(percent: u8, n: u64) -> u64 {
  (percent as u64 * n + 99) / 100
}

/// The samples of one epoch.
#[derive(Clone, Default, Debug)]
struct Window {
  /// Arrival order; the front is the oldest sample.
  samples      : VecDeque<f64>,
  /// The same values in ascending order.
  sorted       : Vec<f64>,
  /// Sum of `samples`, maintained incrementally.
  sum          : f64,
  /// Samples added during this epoch, including evicted ones.
  samples_seen : u64,
}

impl Window {
  fn for_config(config: &TrimConfig) -> Window {
    let capacity = std::cmp::min(config.window_size as usize, MAX_PREALLOCATED_SAMPLES);
    Window {
      samples      : VecDeque::with_capacity(capacity + 1),
      sorted       : Vec::with_capacity(capacity + 1),
      sum          : 0.0,
      samples_seen : 0
    }
  }

  fn push(&mut self, value: f64) {
    self.samples_seen += 1;
    self.samples.push_back(value);
    let idx = bisect_right(&self.sorted, value);
    self.sorted.insert(idx, value);
    self.sum += value;
  }

  fn evict_oldest(&mut self) {
    if let Some(oldest) = self.samples.pop_front() {
      self.sum -= oldest;
      let idx = bisect_left(&self.sorted, oldest);
      if idx < self.sorted.len() {
        self.sorted.remove(idx);
      }
    }
  }

  fn len(&self) -> usize {
    self.samples.len()
  }
}

/**
  Index just past every element not greater than `value`, found with `<` only, so that the
  position chosen for a NaN is deterministic.
*/
fn bisect_right(sorted: &[f64], value: f64) -> usize {
  let mut lo = 0;
  let mut hi = sorted.len();
  while lo < hi {
    let mid = (lo + hi) / 2;
    if value < sorted[mid] {
      hi = mid;
    } else {
      lo = mid + 1;
    }
  }
  lo
}

/// Index of the first element not less than `value`; the counterpart of `bisect_right`.
fn bisect_left(sorted: &[f64], value: f64) -> usize {
  let mut lo = 0;
  let mut hi = sorted.len();
  while lo < hi {
    let mid = (lo + hi) / 2;
    if sorted[mid] < value {
      lo = mid + 1;
    } else {
      hi = mid;
    }
  }
  lo
}

/// Configuration plus the sliding window of the current epoch.
#[derive(Clone, Default, Debug)]
pub struct Engine {
  config : TrimConfig,
  window : Window,
}

impl Engine {

  pub fn new() -> Engine {
    Engine::default()
  }

  /// An engine whose parameters start at `config` instead of zero.
  pub fn with_config(config: TrimConfig) -> Engine {
    Engine {
      config,
      window: Window::for_config(&config)
    }
  }

  // region Accessors

  pub fn config(&self) -> &TrimConfig {
    &self.config
  }

  /// Number of samples currently in the window.
  pub fn len(&self) -> usize {
    self.window.len()
  }

  pub fn is_empty(&self) -> bool {
    self.window.samples.is_empty()
  }

  /// Samples added since the last reset. This is the index reported with each average.
  pub fn samples_seen(&self) -> u64 {
    self.window.samples_seen
  }

  pub fn running_sum(&self) -> f64 {
    self.window.sum
  }

  /// The window's samples in ascending order.
  pub fn sorted_samples(&self) -> &[f64] {
    &self.window.sorted
  }

  // endregion

  // region Parameter setters

  pub fn set_window_size(&mut self, value: u32) {
    self.assign("window_size", value, |config| &mut config.window_size);
  }

  pub fn set_lower_abs(&mut self, value: u8) {
    self.assign("lower_abs", value, |config| &mut config.lower_abs);
  }

  pub fn set_upper_abs(&mut self, value: u8) {
    self.assign("upper_abs", value, |config| &mut config.upper_abs);
  }

  pub fn set_lower_prop(&mut self, value: u8) {
    self.assign("lower_prop", value, |config| &mut config.lower_prop);
  }

  pub fn set_upper_prop(&mut self, value: u8) {
    self.assign("upper_prop", value, |config| &mut config.upper_prop);
  }

  /// Stores `value` in the selected parameter and starts a new epoch, unless it is already set.
  fn assign<T>(&mut self, name: &'static str, value: T, select: fn(&mut TrimConfig) -> &mut T)
    where T: Copy + PartialEq + Display
  {
    let slot = select(&mut self.config);
    if *slot == value {
      return;
    }
    debug!("{} changed from {} to {}, starting a new epoch", name, *slot, value);
    *slot = value;
    self.new_epoch();
  }

  // endregion

  /// Discards the window and restarts the sample index. Parameters are kept.
  pub fn reset(&mut self) {
    debug!("reset after {} samples", self.window.samples_seen);
    self.new_epoch();
  }

  fn new_epoch(&mut self) {
    self.window = Window::for_config(&self.config);
  }

  /**
    Adds `values` to the window in order. Every time the window is full after a sample has been
    added (and the oldest evicted, if needed), the trimmed mean is recorded together with the
    sample's index within the epoch. Returns the recorded pairs in order.
  */
  pub fn add_samples(&mut self, values: &[f64]) -> Vec<(u64, f64)> {
    let mut outputs = Vec::new();
    let window_size = self.config.window_size as usize;

    for &value in values {
      self.window.push(value);

      if window_size > 0 && self.window.len() > window_size {
        self.window.evict_oldest();
      }

      if window_size > 0 && self.window.len() == window_size {
        outputs.push((self.window.samples_seen, self.trimmed_mean()));
      }
    }

    outputs
  }

  /**
    The mean of the window after removing the `low` smallest and the `high` largest values, where
    `(low, high) = config.trims()`. NaN when the window is not full, or when the trims leave
    nothing to average.
  */
  pub fn trimmed_mean(&self) -> f64 {
    let n = self.config.window_size as u64;
    if n == 0 || (self.window.sorted.len() as u64) < n {
      return f64::NAN;
    }

    let (low, high) = self.config.trims();
    if low + high >= n {
      return f64::NAN;
    }

    let sorted = &self.window.sorted;
    let (low, high) = (low as usize, high as usize);
    let mut trimmed_sum = self.window.sum;
    if low > 0 {
      trimmed_sum -= sorted[..low].iter().fold(0.0_f64, |total, v| total + *v);
    }
    if high > 0 {
      trimmed_sum -= sorted[sorted.len() - high..].iter().fold(0.0_f64, |total, v| total + *v);
    }

    trimmed_sum / (n - low as u64 - high as u64) as f64
  }

  // region Display methods

  fn make_sample_table<'a, I>(samples: I) -> Table
    where I: Iterator<Item = &'a f64>
  {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"#", ubl->"Value"]);
    for (i, sample) in samples.enumerate() {
      table.add_row(row![r->i, sample]);
    }
    table
  }

  // endregion
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Engine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let config = &self.config;
    let (low, high) = config.trims();

    let window_table = Engine::make_sample_table(self.window.samples.iter());
    let sorted_table = Engine::make_sample_table(self.window.sorted.iter());

    let mut combined_table = table!([window_table, sorted_table]);
    combined_table.set_titles(row![ub->"Window", ub->"Sorted"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(
      f,
      "window_size: {}  lower: max({}, {}%) = {}  upper: max({}, {}%) = {}\n\
       samples_seen: {}  sum: {}\n{}",
      config.window_size,
      config.lower_abs, config.lower_prop, low,
      config.upper_abs, config.upper_prop, high,
      self.window.samples_seen,
      self.window.sum,
      combined_table
    )
  }
}
