use {
    alloy::{
        primitives::U256,
        providers::{DynProvider, Provider},
    },
    anyhow::{Context, Result, ensure},
    std::time::Duration,
};

/// Restores the node to the state it had when the resetter was created.
pub struct Resetter {
    api: TestNodeApi,
    snapshot_id: U256,
}

impl Resetter {
    pub async fn new(provider: &DynProvider) -> Self {
        let api = TestNodeApi::new(provider.clone());
        let snapshot_id = api
            .snapshot()
            .await
            .expect("Test network must support evm_snapshot");
        Self { api, snapshot_id }
    }

    pub async fn reset(&self) {
        self.api
            .revert(self.snapshot_id)
            .await
            .expect("Test network must support evm_revert");
    }
}

/// Implements functions that are only available in a testing node.
///
/// Both ganache and anvil support these calls.
#[derive(Debug, Clone)]
pub struct TestNodeApi {
    provider: DynProvider,
}

impl TestNodeApi {
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }

    pub async fn snapshot(&self) -> Result<U256> {
        self.provider
            .raw_request("evm_snapshot".into(), ())
            .await
            .context("evm_snapshot failed")
    }

    pub async fn revert(&self, snapshot_id: U256) -> Result<()> {
        let reverted: bool = self
            .provider
            .raw_request("evm_revert".into(), (snapshot_id,))
            .await
            .context("evm_revert failed")?;
        ensure!(reverted, "node did not revert to snapshot {snapshot_id}");
        Ok(())
    }

    /// Moves the node's clock forward and mines a block so the new time is
    /// visible as the latest block timestamp.
    pub async fn increase_time(&self, duration: Duration) -> Result<()> {
        let _: serde_json::Value = self
            .provider
            .raw_request("evm_increaseTime".into(), (duration.as_secs(),))
            .await
            .context("evm_increaseTime failed")?;
        self.mine_pending_block().await
    }

    pub async fn mine_pending_block(&self) -> Result<()> {
        let _: serde_json::Value = self
            .provider
            .raw_request("evm_mine".into(), ())
            .await
            .context("evm_mine failed")?;
        Ok(())
    }
}
