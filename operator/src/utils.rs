use crate::error::{Error, Result};
use sha3::{Digest, Keccak256};
use web3::contract::Error as ContractError;
use web3::signing::SecretKey;
use web3::types::{Address, H256, U256};

pub const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// Parses a hex private key (with or without `0x`) and derives its address.
#[inline(always)]
pub fn extract_keypair_from_str(sk_str: &str) -> Result<(SecretKey, Address)> {
    let trimmed = sk_str.trim();
    let hex_key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let raw = hex::decode(hex_key).map_err(|e| Error::InvalidKey(e.to_string()))?;
    let root_sk = SecretKey::from_slice(&raw).map_err(|e| Error::InvalidKey(e.to_string()))?;
    let s = secp256k1::Secp256k1::signing_only();
    let root_pk = secp256k1::PublicKey::from_secret_key(&s, &root_sk);
    let mut res = [0u8; 64];
    res.copy_from_slice(&root_pk.serialize_uncompressed()[1..65]);
    let root_addr = Address::from(H256::from_slice(Keccak256::digest(res).as_slice()));
    Ok((root_sk, root_addr))
}

#[inline(always)]
pub fn handle_error(error: ContractError) -> String {
    match error {
        ContractError::InvalidOutputType(s) => format!("Invalid output type: {}", s),
        ContractError::Abi(e) => format!("Abi error: {}", e),
        ContractError::Api(e) => format!("Api error: {}", e),
        ContractError::Deployment(e) => format!("Deployment error: {}", e),
        ContractError::InterfaceUnsupported => "Contract does not support this interface.".to_string(),
    }
}

/// Whole ether units to wei.
pub fn parse_ether(units: u64) -> U256 {
    U256::from(units) * U256::from(WEI_PER_ETHER)
}

/// Renders a wei amount as decimal ether, e.g. `0.1` or `42.0`.
pub fn format_ether(wei: U256) -> String {
    let (whole, frac) = wei.div_mod(U256::from(WEI_PER_ETHER));
    let frac = format!("{:018}", frac.as_u64());
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, frac)
    }
}

pub fn get_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    // first well-known anvil/hardhat dev account
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_extract_keypair() {
        let (_, addr) = extract_keypair_from_str(DEV_KEY).unwrap();
        let expected: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        assert_eq!(addr, expected);

        let (_, no_prefix) = extract_keypair_from_str(&DEV_KEY[2..]).unwrap();
        assert_eq!(no_prefix, expected);
    }

    #[test]
    fn test_keypair_signs_for_derived_address() {
        use web3::signing::{Key, SecretKeyRef};

        let (sk, addr) = extract_keypair_from_str(DEV_KEY).unwrap();
        assert_eq!(SecretKeyRef::new(&sk).address(), addr);
    }

    #[test]
    fn test_extract_keypair_invalid() {
        assert!(matches!(extract_keypair_from_str("0x1234"), Err(Error::InvalidKey(_))));
        assert!(extract_keypair_from_str("").is_err());
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(U256::from(100_000_000_000_000_000u64)), "0.1");
        assert_eq!(format_ether(parse_ether(42)), "42.0");
        assert_eq!(format_ether(U256::from(1_500_000_000_000_000_000u64)), "1.5");
        assert_eq!(format_ether(U256::zero()), "0.0");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
    }

    #[test]
    fn test_parse_ether() {
        assert_eq!(parse_ether(1), U256::from(WEI_PER_ETHER));
        assert_eq!(parse_ether(100), U256::from(WEI_PER_ETHER) * 100);
    }
}
