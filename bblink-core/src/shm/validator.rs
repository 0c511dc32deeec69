// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Mailbox message validation.
//!
//! A mailbox word carries the command in its low 16 bits and the bitwise
//! complement of the command in its high 16 bits. A word that breaks this
//! invariant is never trusted.

use std::fmt;

use serde::Serialize;

use crate::error::ProtocolError;

/// Mask selecting the command half of a mailbox word.
pub const COMMAND_MASK: u32 = 0xFFFF;

/// Raw command values carried in the low half of the mailbox word.
pub mod cmd {
    pub const READY: u16 = 0x0001;
    pub const BOOT_COLD_BOOT_IND: u16 = 0x0002;
    pub const BOOT_FW_REQ: u16 = 0x0003;
    pub const BOOT_RESTART_FW_REQ: u16 = 0x0004;
    pub const BOOT_FW_CONF: u16 = 0x0005;
    pub const BOOT_ERROR_BT2_HDR: u16 = 0x1000;
    pub const BOOT_ERROR_BT2_SIGN: u16 = 0x1001;
    pub const BOOT_ERROR_HWID: u16 = 0x1002;
    pub const BOOT_ERROR_APP_HDR: u16 = 0x1003;
    pub const BOOT_ERROR_APP_SIGN: u16 = 0x1004;
    pub const BOOT_ERROR_UNLOCK_HEADER: u16 = 0x1005;
    pub const BOOT_ERROR_UNLOCK_SIGN: u16 = 0x1006;
    pub const BOOT_ERROR_UNLOCK_PCID: u16 = 0x1007;
}

/// Secure-boot failures reported by the baseband.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BootErrorKind {
    Bt2Header,
    Bt2Signature,
    HwId,
    AppHeader,
    AppSignature,
    UnlockHeader,
    UnlockSignature,
    UnlockPcid,
}

impl BootErrorKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bt2Header => "bt2-header",
            Self::Bt2Signature => "bt2-signature",
            Self::HwId => "hw-id",
            Self::AppHeader => "app-header",
            Self::AppSignature => "app-signature",
            Self::UnlockHeader => "unlock-header",
            Self::UnlockSignature => "unlock-signature",
            Self::UnlockPcid => "unlock-pcid",
        }
    }
}

impl fmt::Display for BootErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decoded mailbox command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IpcCommand {
    Ready,
    BootColdBootInd,
    BootFwRequest,
    BootRestartFwRequest,
    BootFwConf,
    BootError(BootErrorKind),
    Unknown(u16),
}

impl IpcCommand {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::BootColdBootInd => "BOOT_COLD_BOOT_IND",
            Self::BootFwRequest => "BOOT_FW_REQ",
            Self::BootRestartFwRequest => "BOOT_RESTART_FW_REQ",
            Self::BootFwConf => "BOOT_FW_CONF",
            Self::BootError(_) => "BOOT_ERROR",
            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// Raw 16-bit value of this command.
    pub const fn raw(&self) -> u16 {
        match self {
            Self::Ready => cmd::READY,
            Self::BootColdBootInd => cmd::BOOT_COLD_BOOT_IND,
            Self::BootFwRequest => cmd::BOOT_FW_REQ,
            Self::BootRestartFwRequest => cmd::BOOT_RESTART_FW_REQ,
            Self::BootFwConf => cmd::BOOT_FW_CONF,
            Self::BootError(kind) => match kind {
                BootErrorKind::Bt2Header => cmd::BOOT_ERROR_BT2_HDR,
                BootErrorKind::Bt2Signature => cmd::BOOT_ERROR_BT2_SIGN,
                BootErrorKind::HwId => cmd::BOOT_ERROR_HWID,
                BootErrorKind::AppHeader => cmd::BOOT_ERROR_APP_HDR,
                BootErrorKind::AppSignature => cmd::BOOT_ERROR_APP_SIGN,
                BootErrorKind::UnlockHeader => cmd::BOOT_ERROR_UNLOCK_HEADER,
                BootErrorKind::UnlockSignature => cmd::BOOT_ERROR_UNLOCK_SIGN,
                BootErrorKind::UnlockPcid => cmd::BOOT_ERROR_UNLOCK_PCID,
            },
            Self::Unknown(raw) => *raw,
        }
    }
}

impl From<u16> for IpcCommand {
    fn from(value: u16) -> Self {
        match value {
            cmd::READY => Self::Ready,
            cmd::BOOT_COLD_BOOT_IND => Self::BootColdBootInd,
            cmd::BOOT_FW_REQ => Self::BootFwRequest,
            cmd::BOOT_RESTART_FW_REQ => Self::BootRestartFwRequest,
            cmd::BOOT_FW_CONF => Self::BootFwConf,
            cmd::BOOT_ERROR_BT2_HDR => Self::BootError(BootErrorKind::Bt2Header),
            cmd::BOOT_ERROR_BT2_SIGN => Self::BootError(BootErrorKind::Bt2Signature),
            cmd::BOOT_ERROR_HWID => Self::BootError(BootErrorKind::HwId),
            cmd::BOOT_ERROR_APP_HDR => Self::BootError(BootErrorKind::AppHeader),
            cmd::BOOT_ERROR_APP_SIGN => Self::BootError(BootErrorKind::AppSignature),
            cmd::BOOT_ERROR_UNLOCK_HEADER => Self::BootError(BootErrorKind::UnlockHeader),
            cmd::BOOT_ERROR_UNLOCK_SIGN => Self::BootError(BootErrorKind::UnlockSignature),
            cmd::BOOT_ERROR_UNLOCK_PCID => Self::BootError(BootErrorKind::UnlockPcid),
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for IpcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BootError(kind) => write!(f, "BOOT_ERROR({})", kind),
            Self::Unknown(raw) => write!(f, "UNKNOWN({:#06x})", raw),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Validator and encoder for mailbox words.
pub struct MailboxMessage;

impl MailboxMessage {
    /// Check the complement invariant and extract the command.
    pub fn validate(word: u32) -> Result<u16, ProtocolError> {
        let command = word & COMMAND_MASK;
        if ((!word >> 16) ^ command) & COMMAND_MASK != 0 {
            return Err(ProtocolError::IntegrityFailure { word });
        }
        Ok(command as u16)
    }

    /// Validate and decode in one step.
    pub fn decode(word: u32) -> Result<IpcCommand, ProtocolError> {
        Self::validate(word).map(IpcCommand::from)
    }

    /// Build a well-formed mailbox word for `command` (peer side).
    pub fn encode(command: u16) -> u32 {
        let command = u32::from(command);
        ((!command & COMMAND_MASK) << 16) | command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_word_accepted() {
        assert_eq!(MailboxMessage::validate(0xFFFE_0001), Ok(cmd::READY));
        assert_eq!(MailboxMessage::decode(0xFFFE_0001), Ok(IpcCommand::Ready));
    }

    #[test]
    fn test_missing_complement_rejected() {
        assert_eq!(
            MailboxMessage::validate(0x0000_0001),
            Err(ProtocolError::IntegrityFailure { word: 0x0000_0001 })
        );
        // All-zero and all-ones words are not self-complementary either.
        assert!(MailboxMessage::validate(0).is_err());
        assert!(MailboxMessage::validate(u32::MAX).is_err());
    }

    #[test]
    fn test_accepts_iff_high_half_is_complement() {
        // Sweep commands against a spread of high halves.
        for command in (0u32..=0xFFFF).step_by(251).chain([0, 1, 0xFFFF]) {
            for high in (0u32..=0xFFFF).step_by(4093).chain([!command & 0xFFFF]) {
                let word = (high << 16) | command;
                let expected = high == (!command & 0xFFFF);
                assert_eq!(
                    MailboxMessage::validate(word).is_ok(),
                    expected,
                    "word {:#010x}",
                    word
                );
            }
        }
    }

    #[test]
    fn test_encode_produces_valid_words() {
        assert_eq!(MailboxMessage::encode(cmd::READY), 0xFFFE_0001);
        for raw in [0u16, cmd::BOOT_FW_REQ, cmd::BOOT_ERROR_UNLOCK_PCID, 0xFFFF] {
            assert_eq!(MailboxMessage::validate(MailboxMessage::encode(raw)), Ok(raw));
        }
    }

    #[test]
    fn test_command_decoding() {
        assert_eq!(IpcCommand::from(cmd::BOOT_FW_REQ), IpcCommand::BootFwRequest);
        assert_eq!(
            IpcCommand::from(cmd::BOOT_ERROR_HWID),
            IpcCommand::BootError(BootErrorKind::HwId)
        );
        assert_eq!(IpcCommand::from(0x4242), IpcCommand::Unknown(0x4242));
        assert_eq!(IpcCommand::Unknown(0x4242).to_string(), "UNKNOWN(0x4242)");
    }

    #[test]
    fn test_raw_matches_decoding() {
        for raw in (0x0000..=0x0006).chain(0x0FFF..=0x1008) {
            assert_eq!(IpcCommand::from(raw).raw(), raw);
        }
    }
}
