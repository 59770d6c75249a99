/// Errors that can occur while building or parsing packets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    /// The parameter id does not belong to the RX or TX module.
    #[error("unsupported parameter id {0:#010x}")]
    UnsupportedParameter(u32),

    /// The packet buffer could not be allocated.
    #[error("failed to allocate {size} byte packet")]
    AllocationFailure { size: usize },

    /// An external-config chunk exceeds the per-packet limit.
    #[error("chunk too large ({size} bytes, max {max})")]
    ChunkTooLarge { size: usize, max: usize },

    /// A logical payload cannot be described by the 32-bit size fields.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The buffer ends before the structure it should contain.
    #[error("truncated packet (needed {needed} bytes, have {available})")]
    Truncated { needed: usize, available: usize },

    /// The opcode is not one this protocol uses.
    #[error("unknown opcode {0:#010x}")]
    UnknownOpcode(u32),

    /// The transport delivered a response without a payload.
    #[error("response carries no payload")]
    MissingPayload,
}

pub type Result<T> = std::result::Result<T, PacketError>;
