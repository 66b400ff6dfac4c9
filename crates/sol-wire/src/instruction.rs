//! Compiled instruction codec.
//!
//! ```text
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact length
//!   account_indexes         u8 * num_accounts
//!   data_len                compact length
//!   data                    u8 * data_len
//! ```
//!
//! Indexes are kept as-is; resolving them against the message's accounts is
//! the message layer's job.

use crate::cursor::{WireReader, WireWriter};
use crate::error::WireError;
use crate::varint::encoded_length_len;

/// An instruction as it appears inside a message: accounts are u8 indexes
/// into the message's unified account list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indexes: Vec<u8>,
    pub data: Vec<u8>,
}

impl CompiledInstruction {
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let program_id_index = reader.read_u8()?;
        let account_indexes = reader.read_compact_bytes()?.to_vec();
        let data = reader.read_compact_bytes()?.to_vec();
        Ok(Self {
            program_id_index,
            account_indexes,
            data,
        })
    }

    /// Decode one instruction at `offset`, returning it together with the
    /// number of bytes it occupied.
    pub fn decode(data: &[u8], offset: usize) -> Result<(Self, usize), WireError> {
        let mut reader = WireReader::at(data, offset);
        let ix = Self::read(&mut reader)?;
        Ok((ix, reader.position() - offset))
    }

    pub fn write(&self, writer: &mut WireWriter) {
        writer.put_u8(self.program_id_index);
        writer.put_compact_bytes(&self.account_indexes);
        writer.put_compact_bytes(&self.data);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer = WireWriter::with_capacity(self.encoded_len());
        self.write(&mut writer);
        writer.into_bytes()
    }

    pub fn encoded_len(&self) -> usize {
        1 + encoded_length_len(self.account_indexes.len())
            + self.account_indexes.len()
            + encoded_length_len(self.data.len())
            + self.data.len()
    }

    /// Every index this instruction references, program first.
    pub fn referenced_indexes(&self) -> impl Iterator<Item = u8> + '_ {
        std::iter::once(self.program_id_index).chain(self.account_indexes.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_like() -> CompiledInstruction {
        CompiledInstruction {
            program_id_index: 2,
            account_indexes: vec![0, 1],
            data: vec![2, 0, 0, 0, 0xe8, 0x03, 0, 0, 0, 0, 0, 0],
        }
    }

    #[test]
    fn encode_layout() {
        let bytes = transfer_like().encode();
        assert_eq!(&bytes[..4], &[2, 2, 0, 1]);
        assert_eq!(bytes[4], 12);
        assert_eq!(bytes.len(), 5 + 12);
        assert_eq!(transfer_like().encoded_len(), bytes.len());
    }

    #[test]
    fn decode_reports_consumed_length() {
        let mut data = vec![0xee, 0xee];
        data.extend_from_slice(&transfer_like().encode());
        data.push(0xff);

        let (ix, consumed) = CompiledInstruction::decode(&data, 2).unwrap();
        assert_eq!(ix, transfer_like());
        assert_eq!(consumed, 17);
    }

    #[test]
    fn decode_does_not_resolve_indexes() {
        // Index 200 is nonsense for any real message but fine at this layer.
        let ix = CompiledInstruction {
            program_id_index: 200,
            account_indexes: vec![199],
            data: vec![],
        };
        let (decoded, _) = CompiledInstruction::decode(&ix.encode(), 0).unwrap();
        assert_eq!(decoded.program_id_index, 200);
    }

    #[test]
    fn long_data_uses_multi_byte_prefix() {
        let ix = CompiledInstruction {
            program_id_index: 0,
            account_indexes: vec![],
            data: vec![7; 300],
        };
        let bytes = ix.encode();
        assert_eq!(&bytes[..4], &[0, 0, 0xac, 0x02]);
        assert_eq!(ix.encoded_len(), bytes.len());
    }

    #[test]
    fn truncated_instruction_fails() {
        let bytes = transfer_like().encode();
        for cut in 0..bytes.len() {
            assert!(
                CompiledInstruction::decode(&bytes[..cut], 0).is_err(),
                "cut at {cut} should fail"
            );
        }
    }

    #[test]
    fn referenced_indexes_lists_program_first() {
        let idx: Vec<u8> = transfer_like().referenced_indexes().collect();
        assert_eq!(idx, vec![2, 0, 1]);
    }
}
