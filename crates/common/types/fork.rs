use serde::{Deserialize, Serialize};

/// Protocol revisions supported by the execution engine, oldest first.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum Fork {
    #[default]
    Frontier,
    Homestead,
    TangerineWhistle,
    SpuriousDragon,
    Byzantium,
}

/// A single activation rule: `fork` applies from block `block` onwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkRule {
    pub block: u64,
    pub fork: Fork,
}

/// Ordered list of fork activation rules.
///
/// The fork for a block is the one of the *last* rule, in list order, whose
/// start block is at or below it. Lists are normally sorted, in which case this
/// is simply the highest activated fork; unsorted lists keep the same rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForkConfig {
    rules: Vec<ForkRule>,
}

impl ForkConfig {
    pub fn new(rules: impl IntoIterator<Item = (u64, Fork)>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(block, fork)| ForkRule { block, fork })
                .collect(),
        }
    }

    /// Every block runs under `fork`.
    pub fn single(fork: Fork) -> Self {
        Self::new([(0, fork)])
    }

    /// Ethereum mainnet activation blocks.
    pub fn mainnet() -> Self {
        Self::new([
            (0, Fork::Frontier),
            (1_150_000, Fork::Homestead),
            (2_463_000, Fork::TangerineWhistle),
            (2_675_000, Fork::SpuriousDragon),
            (4_370_000, Fork::Byzantium),
        ])
    }

    pub fn rules(&self) -> &[ForkRule] {
        &self.rules
    }

    /// Fork governing `block_number`. Blocks before every rule run as Frontier.
    pub fn fork_at(&self, block_number: u64) -> Fork {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.block <= block_number)
            .map(|rule| rule.fork)
            .unwrap_or_default()
    }
}

impl Default for ForkConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Chain-wide execution parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    #[serde(default)]
    pub forks: ForkConfig,
}

impl ChainConfig {
    pub fn new(chain_id: u64, forks: ForkConfig) -> Self {
        Self { chain_id, forks }
    }

    pub fn fork(&self, block_number: u64) -> Fork {
        self.forks.fork_at(block_number)
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            forks: ForkConfig::mainnet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_mainnet_boundaries() {
        let forks = ForkConfig::mainnet();
        assert_eq!(forks.fork_at(0), Fork::Frontier);
        assert_eq!(forks.fork_at(1_149_999), Fork::Frontier);
        assert_eq!(forks.fork_at(1_150_000), Fork::Homestead);
        assert_eq!(forks.fork_at(2_463_000), Fork::TangerineWhistle);
        assert_eq!(forks.fork_at(2_675_000), Fork::SpuriousDragon);
        assert_eq!(forks.fork_at(u64::MAX), Fork::Byzantium);
    }

    #[test]
    fn test_last_matching_rule_wins() {
        let forks = ForkConfig::new([(0, Fork::Frontier), (10, Fork::Byzantium), (5, Fork::Homestead)]);
        assert_eq!(forks.fork_at(4), Fork::Frontier);
        assert_eq!(forks.fork_at(7), Fork::Homestead);
        // both the Byzantium and the later Homestead rule match; the later one wins
        assert_eq!(forks.fork_at(12), Fork::Homestead);
    }

    #[test]
    fn test_no_rule_defaults_to_frontier() {
        let forks = ForkConfig::new([(100, Fork::Byzantium)]);
        assert_eq!(forks.fork_at(99), Fork::Frontier);
    }

    #[test]
    fn test_chain_config_from_json() {
        let json = r#"{
            "chainId": 1337,
            "forks": [
                {"block": 0, "fork": "homestead"},
                {"block": 3, "fork": "spuriousDragon"}
            ]
        }"#;
        let config: ChainConfig = serde_json::from_str(json).expect("valid chain config");
        assert_eq!(config.chain_id, 1337);
        assert_eq!(config.fork(2), Fork::Homestead);
        assert_eq!(config.fork(3), Fork::SpuriousDragon);
    }

    #[test]
    fn test_fork_from_str() {
        assert_eq!(Fork::from_str("byzantium"), Ok(Fork::Byzantium));
        assert_eq!(Fork::from_str("TangerineWhistle"), Ok(Fork::TangerineWhistle));
        assert_eq!(Fork::SpuriousDragon.to_string(), "spuriousDragon");
    }
}
