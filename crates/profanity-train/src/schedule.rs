//! Linear learning-rate schedule with optional warm-up.

/// Linearly ramps from 0 to `base_lr` over `warmup_steps`, then decays
/// linearly to 0 at `total_steps`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSchedule {
    base_lr: f64,
    warmup_steps: usize,
    total_steps: usize,
}

impl LinearSchedule {
    pub fn new(base_lr: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self {
            base_lr,
            warmup_steps,
            total_steps,
        }
    }

    /// Learning rate to use for optimiser step number `step` (0-based).
    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.base_lr * step as f64 / self.warmup_steps.max(1) as f64;
        }
        let remaining = self.total_steps.saturating_sub(step) as f64;
        let span = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
        self.base_lr * (remaining / span).max(0.0)
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-15
    }

    #[test]
    fn test_no_warmup_starts_at_base_and_decays_to_zero() {
        let s = LinearSchedule::new(2e-5, 0, 100);
        assert!(close(s.lr_at(0), 2e-5));
        assert!(close(s.lr_at(50), 1e-5));
        assert!(close(s.lr_at(99), 2e-7));
        assert_eq!(s.lr_at(100), 0.0);
        assert_eq!(s.lr_at(250), 0.0);
    }

    #[test]
    fn test_warmup_ramp() {
        let s = LinearSchedule::new(1.0, 10, 110);
        assert_eq!(s.lr_at(0), 0.0);
        assert!(close(s.lr_at(5), 0.5));
        assert!(close(s.lr_at(10), 1.0));
        assert!(close(s.lr_at(60), 0.5));
    }

    #[test]
    fn test_monotone_after_warmup() {
        let s = LinearSchedule::new(3e-5, 0, 40);
        for step in 1..=40 {
            assert!(s.lr_at(step) <= s.lr_at(step - 1));
        }
    }

    #[test]
    fn test_zero_total_steps() {
        let s = LinearSchedule::new(1e-3, 0, 0);
        assert_eq!(s.lr_at(0), 0.0);
        assert_eq!(s.total_steps(), 0);
    }
}
