mod test_calibrate;

/// Relative tolerance for finite-difference gradient checks.
pub const FD_TOLERANCE: f64 = 1e-5;
