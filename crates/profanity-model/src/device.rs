//! Compute device resolution.

use candle_core::Device;
use profanity_core::{DevicePreference, ProfanityError, Result};

/// Resolve a [`DevicePreference`] to a Candle device.
///
/// `Auto` tries CUDA, then Metal (each only when compiled in), then CPU and
/// never fails. An explicit accelerator that is unavailable is an error.
pub fn select_device(preference: DevicePreference) -> Result<Device> {
    let device = match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => cuda()?,
        DevicePreference::Metal => metal()?,
        DevicePreference::Auto => cuda().or_else(|_| metal()).unwrap_or(Device::Cpu),
    };
    tracing::info!(?preference, device = ?device, "Selected compute device");
    Ok(device)
}

#[cfg(feature = "cuda")]
fn cuda() -> Result<Device> {
    Device::new_cuda(0).map_err(|e| ProfanityError::Config(format!("CUDA device 0 unavailable: {e}")))
}

#[cfg(not(feature = "cuda"))]
fn cuda() -> Result<Device> {
    Err(ProfanityError::Config(
        "CUDA requested but the `cuda` feature is not enabled".to_string(),
    ))
}

#[cfg(feature = "metal")]
fn metal() -> Result<Device> {
    Device::new_metal(0)
        .map_err(|e| ProfanityError::Config(format!("Metal device 0 unavailable: {e}")))
}

#[cfg(not(feature = "metal"))]
fn metal() -> Result<Device> {
    Err(ProfanityError::Config(
        "Metal requested but the `metal` feature is not enabled".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_is_always_available() {
        assert!(matches!(
            select_device(DevicePreference::Cpu).unwrap(),
            Device::Cpu
        ));
    }

    #[cfg(not(any(feature = "cuda", feature = "metal")))]
    #[test]
    fn test_auto_falls_back_to_cpu() {
        assert!(matches!(
            select_device(DevicePreference::Auto).unwrap(),
            Device::Cpu
        ));
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_explicit_cuda_without_feature_fails() {
        let err = select_device(DevicePreference::Cuda).unwrap_err();
        assert!(matches!(err, ProfanityError::Config(_)));
    }
}
