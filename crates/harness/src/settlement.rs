use {
    crate::{error::SettlementError, traits::SettlementSystem},
    alloy::primitives::{Address, U256},
    model::order::{FillResults, OrderStatus, SignedOrder},
};

/// Submits signed orders to the settlement system on behalf of a taker.
///
/// Everything that can be checked before submission is checked here so the
/// caller gets a precise error instead of a bare revert. Nothing is retried.
pub struct Invoker<'a> {
    system: &'a dyn SettlementSystem,
    gas_limit: u64,
}

impl<'a> Invoker<'a> {
    pub fn new(system: &'a dyn SettlementSystem, gas_limit: u64) -> Self {
        Self { system, gas_limit }
    }

    pub async fn fill(
        &self,
        order: &SignedOrder,
        amount: U256,
        taker: Address,
    ) -> Result<FillResults, SettlementError> {
        let data = order.data();
        let info = self
            .system
            .order_info(data)
            .await
            .map_err(SettlementError::Node)?;
        if info.status != OrderStatus::Fillable {
            return Err(SettlementError::NotFillable {
                hash: info.hash,
                status: info.status,
            });
        }
        if amount.is_zero() {
            return Err(SettlementError::ZeroFill);
        }
        let remaining = info.remaining(data);
        if amount > remaining {
            return Err(SettlementError::OverFill {
                requested: amount,
                remaining,
            });
        }
        if !data.taker.is_zero() && data.taker != taker {
            return Err(SettlementError::InvalidTaker {
                expected: data.taker,
                actual: taker,
            });
        }
        if !data.sender.is_zero() && data.sender != taker {
            return Err(SettlementError::InvalidSender {
                expected: data.sender,
                actual: taker,
            });
        }
        match order.signer() {
            Ok(signer) if signer == data.maker => (),
            _ => return Err(SettlementError::InvalidSignature { maker: data.maker }),
        }

        tracing::debug!(hash = ?info.hash, %amount, ?taker, gas_limit = self.gas_limit, "filling order");
        let results = self
            .system
            .fill_order(order, amount, taker, self.gas_limit)
            .await?;
        tracing::info!(hash = ?info.hash, ?results, "order filled");
        Ok(results)
    }
}
