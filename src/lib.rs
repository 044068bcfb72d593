//! # Metricast workspace
//!
//! Facade over the workspace crates:
//!
//! - [`metricast`]: features, regression backends, iterative forecasting,
//!   spike detection and evaluation for daily engagement metrics
//! - [`series_math`]: the summary statistics and rolling windows they share
//!
//! ## Example
//!
//! ```
//! use metricast_workspace::series_math::RollingWindow;
//!
//! let mut window = RollingWindow::new(3).unwrap();
//! for value in [1.0, 2.0, 3.0, 4.0] {
//!     window.update(value);
//! }
//! assert_eq!(window.mean().unwrap(), 3.0);
//! ```

pub use metricast;
pub use series_math;

/// Version of the workspace facade
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
