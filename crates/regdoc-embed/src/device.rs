use candle_core::Device;
use tracing::{debug, info};

/// First available accelerator for the enabled features, else CPU.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => { info!("device: metal"); return dev; }
            Err(e) => debug!("metal not available: {e}"),
        }
    }
    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(dev) => { info!("device: cuda"); return dev; }
            Err(e) => debug!("cuda not available: {e}"),
        }
    }
    debug!("no accelerator feature matched");
    info!("device: cpu");
    Device::Cpu
}
