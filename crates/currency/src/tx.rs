//! Legacy (pre-EIP-1559) value transfers with EIP-155 replay protection.

use alloy_primitives::{Address, B256, Bytes, Signature, U256, keccak256};
use alloy_rlp::{BufMut, Encodable, Header};

/// Gas used by a plain value transfer.
pub const TRANSFER_GAS: u64 = 21_000;

/// An unsigned legacy transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyTransfer {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
}

impl LegacyTransfer {
    /// Hash signed under EIP-155:
    /// `keccak256(rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]))`.
    pub fn signing_hash(&self) -> B256 {
        let mut out = Vec::new();
        let trailer = [self.chain_id, 0, 0];
        let payload_length =
            self.fields_len() + trailer.iter().map(Encodable::length).sum::<usize>();
        Header {
            list: true,
            payload_length,
        }
        .encode(&mut out);
        self.encode_fields(&mut out);
        for value in trailer {
            value.encode(&mut out);
        }
        keccak256(&out)
    }

    /// Raw signed transaction bytes for `eth_sendRawTransaction`.
    pub fn encode_signed(&self, signature: &Signature) -> Vec<u8> {
        let v = self.chain_id * 2 + 35 + u64::from(signature.v());
        let r = signature.r();
        let s = signature.s();

        let mut out = Vec::new();
        let payload_length = self.fields_len() + v.length() + r.length() + s.length();
        Header {
            list: true,
            payload_length,
        }
        .encode(&mut out);
        self.encode_fields(&mut out);
        v.encode(&mut out);
        r.encode(&mut out);
        s.encode(&mut out);
        out
    }

    fn fields_len(&self) -> usize {
        self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.to.length()
            + self.value.length()
            + Bytes::new().length()
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        Bytes::new().encode(out);
    }
}
