use crate::{
    errors::{ExceptionalHalt, PrecompileError, VMError},
    gas_cost::{
        self, ECRECOVER_COST, IDENTITY_DYNAMIC_BASE, IDENTITY_STATIC_COST, RIPEMD_160_DYNAMIC_BASE,
        RIPEMD_160_STATIC_COST, SHA2_256_DYNAMIC_BASE, SHA2_256_STATIC_COST,
    },
};
use bytes::Bytes;
use ferrum_common::{
    Address, H160, H256, Signature, U256,
    types::{Fork, recover_address},
    utils::u256_from_big_endian,
};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Native function behind a precompile: consumes gas from `gas_remaining`
/// and returns the output.
pub type PrecompileFn = fn(&Bytes, &mut u64) -> Result<Bytes, VMError>;

pub struct Precompile {
    pub address: H160,
    pub name: &'static str,
    pub active_since_fork: Fork,
    function: PrecompileFn,
}

impl Precompile {
    pub fn execute(&self, calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
        (self.function)(calldata, gas_remaining)
    }
}

impl std::fmt::Debug for Precompile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Precompile")
            .field("address", &self.address)
            .field("name", &self.name)
            .finish()
    }
}

const fn precompile_address(index: u8) -> H160 {
    let mut bytes = [0u8; 20];
    bytes[19] = index;
    H160(bytes)
}

pub const ECRECOVER: Precompile = Precompile {
    address: precompile_address(0x01),
    name: "ECREC",
    active_since_fork: Fork::Frontier,
    function: ecrecover,
};

pub const SHA2_256: Precompile = Precompile {
    address: precompile_address(0x02),
    name: "SHA256",
    active_since_fork: Fork::Frontier,
    function: sha2_256,
};

pub const RIPEMD_160: Precompile = Precompile {
    address: precompile_address(0x03),
    name: "RIPEMD160",
    active_since_fork: Fork::Frontier,
    function: ripemd_160,
};

pub const IDENTITY: Precompile = Precompile {
    address: precompile_address(0x04),
    name: "ID",
    active_since_fork: Fork::Frontier,
    function: identity,
};

pub const PRECOMPILES: [Precompile; 4] = [ECRECOVER, SHA2_256, RIPEMD_160, IDENTITY];

/// The precompile living at `address` under `fork`, if any.
pub fn find_precompile(address: &Address, fork: Fork) -> Option<&'static Precompile> {
    PRECOMPILES
        .iter()
        .find(|precompile| precompile.address == *address && fork >= precompile.active_since_fork)
}

/// Consumes gas, failing if there is not enough left.
#[inline]
fn increase_precompile_consumed_gas(gas_cost: u64, gas_remaining: &mut u64) -> Result<(), VMError> {
    *gas_remaining = gas_remaining
        .checked_sub(gas_cost)
        .ok_or(ExceptionalHalt::Precompile(PrecompileError::NotEnoughGas))?;
    Ok(())
}

/// Right-pads `calldata` with zeros (or truncates it) to exactly `target_len` bytes.
fn fill_with_zeros(calldata: &[u8], target_len: usize) -> Vec<u8> {
    let mut padded = vec![0u8; target_len];
    for (dst, src) in padded.iter_mut().zip(calldata) {
        *dst = *src;
    }
    padded
}

/// secp256k1 group order.
const SECP256K1_N: U256 = U256([
    0xbfd25e8cd0364141,
    0xbaaedce6af48a03b,
    0xfffffffffffffffe,
    0xffffffffffffffff,
]);

/// ECDSA public key recovery.
///
/// Input is `hash ‖ v ‖ r ‖ s`, 32 bytes each. A signature that cannot be
/// recovered (`v` other than 27 or 28, `r` or `s` outside `[1, n)`) fails
/// after the fixed cost is paid.
pub fn ecrecover(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    increase_precompile_consumed_gas(ECRECOVER_COST, gas_remaining)?;

    let input = fill_with_zeros(calldata, 128);
    let (hash, rest) = input.split_at(32);
    let (v, signature) = rest.split_at(32);
    let (r, s) = signature.split_at(32);

    let invalid = || ExceptionalHalt::Precompile(PrecompileError::InvalidSignature);

    let v = u256_from_big_endian(v);
    let recovery_id = if v == U256::from(27) {
        0u8
    } else if v == U256::from(28) {
        1u8
    } else {
        return Err(invalid().into());
    };
    for component in [r, s] {
        let value = u256_from_big_endian(component);
        if value.is_zero() || value >= SECP256K1_N {
            return Err(invalid().into());
        }
    }

    let mut raw_signature = [0u8; 65];
    raw_signature
        .get_mut(..64)
        .ok_or_else(invalid)?
        .copy_from_slice(signature);
    *raw_signature.get_mut(64).ok_or_else(invalid)? = recovery_id;

    let address = recover_address(
        Signature::from_slice(&raw_signature),
        H256::from_slice(hash),
    )
    .map_err(|_| invalid())?;

    let mut output = [0u8; 32];
    output
        .get_mut(12..)
        .ok_or_else(invalid)?
        .copy_from_slice(address.as_bytes());
    Ok(Bytes::copy_from_slice(&output))
}

/// Returns the calldata received
pub fn identity(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    let gas_cost =
        gas_cost::precompile_linear(IDENTITY_STATIC_COST, IDENTITY_DYNAMIC_BASE, calldata.len())?;
    increase_precompile_consumed_gas(gas_cost, gas_remaining)?;

    Ok(calldata.clone())
}

/// Returns the calldata hashed by sha2-256 algorithm
pub fn sha2_256(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    let gas_cost =
        gas_cost::precompile_linear(SHA2_256_STATIC_COST, SHA2_256_DYNAMIC_BASE, calldata.len())?;
    increase_precompile_consumed_gas(gas_cost, gas_remaining)?;

    let digest = Sha256::digest(calldata);
    Ok(Bytes::copy_from_slice(&digest))
}

/// Returns the calldata hashed by ripemd-160 algorithm, padded by zeros at left
pub fn ripemd_160(calldata: &Bytes, gas_remaining: &mut u64) -> Result<Bytes, VMError> {
    let gas_cost = gas_cost::precompile_linear(
        RIPEMD_160_STATIC_COST,
        RIPEMD_160_DYNAMIC_BASE,
        calldata.len(),
    )?;
    increase_precompile_consumed_gas(gas_cost, gas_remaining)?;

    let digest = Ripemd160::digest(calldata);
    let mut output = [0u8; 32];
    for (dst, src) in output.iter_mut().skip(12).zip(digest.iter()) {
        *dst = *src;
    }
    Ok(Bytes::copy_from_slice(&output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_lookup_by_address() {
        assert_eq!(
            find_precompile(&precompile_address(2), Fork::Frontier).map(|p| p.name),
            Some("SHA256")
        );
        assert!(find_precompile(&precompile_address(5), Fork::Byzantium).is_none());
        assert!(find_precompile(&Address::zero(), Fork::Byzantium).is_none());
    }

    #[test]
    fn test_identity() {
        let mut gas = 100;
        let input = Bytes::from_static(&[1, 2, 3]);
        assert_eq!(identity(&input, &mut gas).expect("identity"), input);
        assert_eq!(gas, 100 - 18);
    }

    #[test]
    fn test_sha256_empty() {
        let mut gas = 60;
        let output = sha2_256(&Bytes::new(), &mut gas).expect("sha256");
        assert_eq!(
            output.as_ref(),
            hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
        assert_eq!(gas, 0);
    }

    #[test]
    fn test_ripemd160_is_left_padded() {
        let mut gas = 1000;
        let output = ripemd_160(&Bytes::new(), &mut gas).expect("ripemd");
        assert_eq!(
            output.as_ref(),
            hex!("0000000000000000000000009c1185a5c5e9fc54612808977ee8f548b2258d31")
        );
        assert_eq!(gas, 1000 - 600);
    }

    #[test]
    fn test_not_enough_gas() {
        let mut gas = 10;
        assert_eq!(
            identity(&Bytes::from_static(&[0; 64]), &mut gas),
            Err(ExceptionalHalt::Precompile(PrecompileError::NotEnoughGas).into())
        );
    }

    #[test]
    fn test_ecrecover_rejects_s_above_order() {
        let mut input = [0u8; 128];
        input[63] = 27;
        input[95] = 1;
        input[96..].copy_from_slice(&SECP256K1_N.to_big_endian());
        let mut gas = 5000;
        assert_eq!(
            ecrecover(&Bytes::copy_from_slice(&input), &mut gas),
            Err(ExceptionalHalt::Precompile(PrecompileError::InvalidSignature).into())
        );
        assert_eq!(gas, 2000);
    }

    #[cfg(feature = "secp256k1")]
    #[test]
    fn test_ecrecover_recovers_signer() {
        let key = secp256k1::SecretKey::from_slice(&[0x42; 32]).expect("key");
        let hash = [0x11u8; 32];
        let (recovery_id, compact) = secp256k1::SECP256K1
            .sign_ecdsa_recoverable(&secp256k1::Message::from_digest(hash), &key)
            .serialize_compact();

        let mut input = [0u8; 128];
        input[..32].copy_from_slice(&hash);
        input[63] = 27 + u8::from(i32::from(recovery_id) == 1);
        input[64..].copy_from_slice(&compact);

        let public = key.public_key(secp256k1::SECP256K1);
        let expected = ferrum_common::utils::keccak(&public.serialize_uncompressed()[1..]);

        let mut gas = 3000;
        let output = ecrecover(&Bytes::copy_from_slice(&input), &mut gas).expect("recover");
        assert_eq!(&output[12..], &expected[12..]);
        assert_eq!(&output[..12], &[0u8; 12]);
        assert_eq!(gas, 0);
    }
}
