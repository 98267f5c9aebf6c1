//! Host metadata capability.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::{Capability, CapabilityDescriptor, Params};
use crate::types::CapabilityResult;

pub struct SystemInfoCapability;

#[async_trait]
impl Capability for SystemInfoCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "system_info",
            "Report the operating system, CPU architecture and processor count of the host.",
        )
    }

    async fn execute(&self, _params: Params) -> Result<CapabilityResult> {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;

        Ok(CapabilityResult::success(
            json!({
                "os": os,
                "family": std::env::consts::FAMILY,
                "arch": arch,
                "cpus": cpus,
                "version": env!("CARGO_PKG_VERSION"),
            }),
            format!("{} ({}), {} CPUs", os, arch, cpus),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_host() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let result = rt.block_on(SystemInfoCapability.execute(Params::new())).unwrap();
        let data = result.data().unwrap();
        assert_eq!(data["os"], std::env::consts::OS);
        assert!(data["cpus"].as_u64().unwrap() >= 1);
    }
}
