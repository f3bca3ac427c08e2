// src/events.rs
//
// Decodes the logs of a receipt against the events declared in an ABI.

use ethers::abi::{Abi, RawLog, Token};
use ethers::types::{Address, TransactionReceipt, H256, U256};
use log::debug;
use std::collections::BTreeMap;

/// One decoded log.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub name: String,
    /// Contract that emitted the log.
    pub address: Address,
    pub params: Vec<(String, Token)>,
    pub transaction_hash: Option<H256>,
    pub log_index: Option<U256>,
}

impl DecodedEvent {
    pub fn param(&self, name: &str) -> Option<&Token> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, value)| value)
    }
}

/// Decoded events grouped by event name. Names with no decoded log are absent.
pub type EventRecords = BTreeMap<String, Vec<DecodedEvent>>;

/// Tries every event of `abi` (or only those in `names`) against every log of
/// `receipt`. Logs that do not decode as an event are skipped.
pub fn decode_receipt_events(abi: &Abi, receipt: &TransactionReceipt, names: Option<&[&str]>) -> EventRecords {
    let mut records = EventRecords::new();
    for event in abi.events() {
        if let Some(names) = names {
            if !names.contains(&event.name.as_str()) {
                continue;
            }
        }
        for log in &receipt.logs {
            let raw = RawLog {
                topics: log.topics.clone(),
                data: log.data.to_vec(),
            };
            match event.parse_log(raw) {
                Ok(parsed) => records.entry(event.name.clone()).or_default().push(DecodedEvent {
                    name: event.name.clone(),
                    address: log.address,
                    params: parsed.params.into_iter().map(|p| (p.name, p.value)).collect(),
                    transaction_hash: log.transaction_hash,
                    log_index: log.log_index,
                }),
                Err(e) => debug!("[EVENTS] Log {:?} is not {}: {}", log.log_index, event.name, e),
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::AbiEncode;
    use ethers::types::{Bytes, Log};

    const ABI: &str = r#"[
        {"type": "event", "name": "Transfer", "anonymous": false, "inputs": [
            {"name": "from", "type": "address", "indexed": true},
            {"name": "to", "type": "address", "indexed": true},
            {"name": "value", "type": "uint256", "indexed": false}]},
        {"type": "event", "name": "Approval", "anonymous": false, "inputs": [
            {"name": "owner", "type": "address", "indexed": true},
            {"name": "spender", "type": "address", "indexed": true},
            {"name": "value", "type": "uint256", "indexed": false}]}
    ]"#;

    fn topic(address: Address) -> H256 {
        H256::from(address)
    }

    fn transfer_log(from: Address, to: Address, value: u64) -> Log {
        Log {
            address: Address::from_low_u64_be(0x70),
            topics: vec![
                H256::from(ethers::utils::keccak256("Transfer(address,address,uint256)")),
                topic(from),
                topic(to),
            ],
            data: Bytes::from(U256::from(value).encode()),
            log_index: Some(U256::zero()),
            ..Default::default()
        }
    }

    fn receipt(logs: Vec<Log>) -> TransactionReceipt {
        TransactionReceipt {
            logs,
            ..Default::default()
        }
    }

    #[test]
    fn test_decodes_and_groups() {
        let abi: Abi = serde_json::from_str(ABI).unwrap();
        let from = Address::from_low_u64_be(1);
        let to = Address::from_low_u64_be(2);
        let records = decode_receipt_events(&abi, &receipt(vec![transfer_log(from, to, 42)]), None);

        assert_eq!(records.len(), 1);
        let transfers = &records["Transfer"];
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].param("from"), Some(&Token::Address(from)));
        assert_eq!(transfers[0].param("value"), Some(&Token::Uint(U256::from(42))));
    }

    #[test]
    fn test_undecodable_logs_skipped() {
        let abi: Abi = serde_json::from_str(ABI).unwrap();
        let junk = Log {
            topics: vec![H256::repeat_byte(0xee)],
            ..Default::default()
        };
        let records = decode_receipt_events(&abi, &receipt(vec![junk]), None);
        assert!(records.is_empty());
    }

    #[test]
    fn test_name_subset() {
        let abi: Abi = serde_json::from_str(ABI).unwrap();
        let log = transfer_log(Address::zero(), Address::from_low_u64_be(3), 1);
        let records = decode_receipt_events(&abi, &receipt(vec![log.clone()]), Some(&["Approval"][..]));
        assert!(records.is_empty());
        let records = decode_receipt_events(&abi, &receipt(vec![log]), Some(&["Transfer"][..]));
        assert_eq!(records["Transfer"].len(), 1);
    }
}
