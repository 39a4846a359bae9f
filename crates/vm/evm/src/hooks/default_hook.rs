use crate::{
    errors::{ContextResult, InternalError, TxValidationError, VMError},
    hooks::hook::Hook,
    vm::VM,
};
use ferrum_common::{Address, U256};
use tracing::{trace, warn};

/// Validation, up-front gas purchase and settlement of a transaction.
///
/// `prepare_execution` leaves the state untouched when it fails, so an
/// invalid transaction can be dropped without side effects.
pub struct DefaultHook;

impl Hook for DefaultHook {
    fn prepare_execution(&mut self, vm: &mut VM<'_>) -> Result<(), VMError> {
        let sender = vm.env.origin;
        let (sender_balance, sender_nonce) = {
            let account = vm.db.get_account(sender)?;
            (account.info.balance, account.info.nonce)
        };

        // (1) NONCE
        validate_sender_nonce(sender_nonce, vm.env.tx_nonce).inspect_err(|error| {
            warn!(?sender, %error, "Rejected transaction");
        })?;

        // (2) INTRINSIC GAS
        let intrinsic_gas = vm.schedule.intrinsic_gas(&vm.tx)?;
        if intrinsic_gas > vm.env.gas_limit {
            warn!(?sender, intrinsic_gas, gas_limit = vm.env.gas_limit, "Rejected transaction");
            return Err(TxValidationError::IntrinsicGasTooLow {
                intrinsic: intrinsic_gas,
                gas_limit: vm.env.gas_limit,
            }
            .into());
        }
        vm.intrinsic_gas = intrinsic_gas;

        // (3) UP-FRONT COST
        let up_front_cost = U256::from(vm.env.gas_limit)
            .checked_mul(vm.env.gas_price)
            .ok_or(TxValidationError::GasLimitPriceProductOverflow)?;
        let total_cost = up_front_cost
            .checked_add(vm.tx.value())
            .ok_or(TxValidationError::InsufficientAccountFunds(sender))?;
        if sender_balance < total_cost {
            warn!(?sender, %sender_balance, %total_cost, "Rejected transaction");
            return Err(TxValidationError::InsufficientAccountFunds(sender).into());
        }

        // (4) CHAIN ID
        if let Some(chain_id) = vm.tx.chain_id()
            && (!vm.schedule.replay_protection() || chain_id != vm.env.chain_id)
        {
            warn!(?sender, chain_id, "Rejected transaction");
            return Err(TxValidationError::InvalidChainId(chain_id).into());
        }

        // (5) BUY GAS
        vm.db.decrease_account_balance(sender, up_front_cost)?;

        trace!(?sender, intrinsic_gas, %up_front_cost, "Transaction prepared");
        Ok(())
    }

    fn finalize_execution(
        &mut self,
        vm: &mut VM<'_>,
        ctx_result: &mut ContextResult,
    ) -> Result<(), VMError> {
        let gas_used = vm
            .intrinsic_gas
            .checked_add(ctx_result.gas_used)
            .ok_or(InternalError::Overflow)?;
        let refund = capped_refund(vm.substate.refunded_gas, gas_used);

        pay_gas(vm, gas_used, refund)?;
        delete_self_destruct_accounts(vm)?;
        if vm.schedule.clears_empty_accounts() {
            delete_touched_empty_accounts(vm)?;
        }

        ctx_result.gas_used = gas_used
            .checked_sub(refund)
            .ok_or(InternalError::Underflow)?;
        vm.substate.refunded_gas = refund;

        Ok(())
    }
}

pub fn validate_sender_nonce(account_nonce: u64, tx_nonce: u64) -> Result<(), VMError> {
    if account_nonce == u64::MAX {
        return Err(TxValidationError::NonceIsMax.into());
    }
    if account_nonce != tx_nonce {
        return Err(TxValidationError::NonceMismatch {
            expected: account_nonce,
            actual: tx_nonce,
        }
        .into());
    }
    Ok(())
}

/// Refunds never exceed half of the gas the transaction used.
pub fn capped_refund(refunded_gas: u64, gas_used: u64) -> u64 {
    refunded_gas.min(gas_used / 2)
}

/// Returns the unused and refunded gas to the sender and pays the rest to the coinbase.
fn pay_gas(vm: &mut VM<'_>, gas_used: u64, refund: u64) -> Result<(), VMError> {
    let gas_price = vm.env.gas_price;

    let gas_to_return = vm
        .env
        .gas_limit
        .checked_sub(gas_used)
        .and_then(|unused| unused.checked_add(refund))
        .ok_or(InternalError::Underflow)?;
    let sender_credit = U256::from(gas_to_return)
        .checked_mul(gas_price)
        .ok_or(InternalError::Overflow)?;
    vm.db.increase_account_balance(vm.env.origin, sender_credit)?;

    let gas_to_pay_coinbase = gas_used
        .checked_sub(refund)
        .ok_or(InternalError::Underflow)?;
    let coinbase_fee = U256::from(gas_to_pay_coinbase)
        .checked_mul(gas_price)
        .ok_or(InternalError::Overflow)?;
    let coinbase = vm.env.coinbase;
    vm.db.increase_account_balance(coinbase, coinbase_fee)?;
    // Paying the fee touches the coinbase, even when the fee is zero.
    vm.substate.touch(coinbase);

    Ok(())
}

fn delete_self_destruct_accounts(vm: &mut VM<'_>) -> Result<(), VMError> {
    let destroyed: Vec<Address> = vm.substate.iter_selfdestruct().copied().collect();
    for address in destroyed {
        trace!(?address, "Deleting self-destructed account");
        vm.db.destroy_account(address)?;
    }
    Ok(())
}

/// EIP-161: touched accounts with no code, zero nonce and zero balance are removed.
fn delete_touched_empty_accounts(vm: &mut VM<'_>) -> Result<(), VMError> {
    let mut touched: Vec<Address> = vm.substate.iter_touched().copied().collect();
    touched.sort();
    touched.dedup();
    for address in touched {
        let account = vm.db.get_account(address)?;
        if account.exists && account.is_empty() {
            trace!(?address, "Deleting touched empty account");
            vm.db.destroy_account(address)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_validation() {
        assert!(validate_sender_nonce(3, 3).is_ok());
        assert_eq!(
            validate_sender_nonce(3, 4),
            Err(VMError::TxValidation(TxValidationError::NonceMismatch {
                expected: 3,
                actual: 4
            }))
        );
        assert_eq!(
            validate_sender_nonce(u64::MAX, u64::MAX),
            Err(VMError::TxValidation(TxValidationError::NonceIsMax))
        );
    }

    #[test]
    fn test_refund_capped_at_half_of_gas_used() {
        assert_eq!(capped_refund(15000, 41000), 15000);
        assert_eq!(capped_refund(39000, 41000), 20500);
        assert_eq!(capped_refund(0, 21000), 0);
    }
}
