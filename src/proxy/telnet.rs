//! Bytewise telnet option filter. Control sequences are consumed and
//! answered from a fixed policy table; payload bytes continue through a
//! SAUCE metadata stripper before reaching the rest of the pipeline.

use bytes::{BufMut, Bytes, BytesMut};

/// Telnet "Interpret As Command" byte
pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
/// Subnegotiation start and end
pub const SB: u8 = 250;
pub const SE: u8 = 240;

/// Telnet option codes the policy table answers for
pub const OPT_ECHO: u8 = 1;
pub const OPT_SUPPRESS_GO_AHEAD: u8 = 3;
pub const OPT_TERMINAL_TYPE: u8 = 24;
pub const OPT_NAWS: u8 = 31;

/// Marker a SAUCE metadata record opens with. Everything from this
/// sequence to the end of the connection is art metadata.
const SAUCE_HEADER: [u8; 8] = [0x1A, b'S', b'A', b'U', b'C', b'E', b'0', b'0'];

/// Where the option filter is within a control sequence. Sequences can
/// straddle chunk boundaries so the state lives on the filter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum TelnetState {
    /// Plain payload bytes
    #[default]
    Data,
    /// An IAC byte was consumed, the follower decides the length
    Iac,
    /// A WILL/WONT/DO/DONT waiting on its option byte
    Command(u8),
    /// Inside IAC SB .. IAC SE, discarded in full
    Subnegotiation,
    /// IAC seen inside a subnegotiation
    SubnegotiationIac,
}

/// Output of one filter pass
#[derive(Debug, Default)]
pub struct FilterOutput {
    /// Payload bytes with the control stream removed
    pub payload: Bytes,
    /// Negotiation responses to write back to the server
    pub responses: Bytes,
}

#[derive(Default)]
pub struct TelnetFilter {
    state: TelnetState,
    /// How much of the SAUCE header has matched; matched bytes are
    /// withheld from output until the match fails
    sauce_matched: usize,
    /// Set once a full SAUCE header has been seen. The record and any
    /// trailer occupy the rest of the stream so nothing is emitted
    /// again for this connection.
    sauce_dropping: bool,
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The negotiations proactively announced when a connection opens
    pub fn hello() -> Bytes {
        Bytes::from_static(&[
            IAC, WILL, OPT_TERMINAL_TYPE,
            IAC, WILL, OPT_NAWS,
            IAC, DO, OPT_ECHO,
            IAC, WILL, OPT_SUPPRESS_GO_AHEAD,
            IAC, DO, OPT_SUPPRESS_GO_AHEAD,
        ])
    }

    /// Runs a chunk of raw bytes through the filter
    pub fn process(&mut self, input: &[u8]) -> FilterOutput {
        let mut payload = BytesMut::with_capacity(input.len());
        let mut responses = BytesMut::new();

        for byte in input.iter().copied() {
            match self.state {
                TelnetState::Data => {
                    if byte == IAC {
                        self.state = TelnetState::Iac;
                    } else {
                        self.emit(byte, &mut payload);
                    }
                }
                TelnetState::Iac => match byte {
                    // Escaped literal 0xFF
                    IAC => {
                        self.emit(IAC, &mut payload);
                        self.state = TelnetState::Data;
                    }
                    WILL | WONT | DO | DONT => {
                        self.state = TelnetState::Command(byte);
                    }
                    SB => {
                        self.state = TelnetState::Subnegotiation;
                    }
                    // Unknown two byte command, consumed and dropped
                    _ => {
                        self.state = TelnetState::Data;
                    }
                },
                TelnetState::Command(command) => {
                    self.respond(command, byte, &mut responses);
                    self.state = TelnetState::Data;
                }
                TelnetState::Subnegotiation => {
                    if byte == IAC {
                        self.state = TelnetState::SubnegotiationIac;
                    }
                }
                TelnetState::SubnegotiationIac => {
                    self.state = if byte == SE {
                        TelnetState::Data
                    } else {
                        TelnetState::Subnegotiation
                    };
                }
            }
        }

        FilterOutput {
            payload: payload.freeze(),
            responses: responses.freeze(),
        }
    }

    /// Answers a negotiation per the policy table
    fn respond(&self, command: u8, option: u8, responses: &mut BytesMut) {
        let reply = match (command, option) {
            (DO | WILL, OPT_TERMINAL_TYPE) => Some((WILL, OPT_TERMINAL_TYPE)),
            (DO | WILL, OPT_NAWS) => Some((WILL, OPT_NAWS)),
            (WILL, OPT_ECHO) => Some((DO, OPT_ECHO)),
            (DO, OPT_SUPPRESS_GO_AHEAD) => Some((WILL, OPT_SUPPRESS_GO_AHEAD)),
            (WILL, OPT_SUPPRESS_GO_AHEAD) => Some((DO, OPT_SUPPRESS_GO_AHEAD)),
            (DO, other) => Some((WONT, other)),
            (WILL, other) => Some((DONT, other)),
            _ => None,
        };
        if let Some((verb, option)) = reply {
            responses.put_slice(&[IAC, verb, option]);
        }
    }

    /// Passes a payload byte through the SAUCE stripper
    fn emit(&mut self, byte: u8, payload: &mut BytesMut) {
        if self.sauce_dropping {
            return;
        }

        if byte == SAUCE_HEADER[self.sauce_matched] {
            self.sauce_matched += 1;
            if self.sauce_matched == SAUCE_HEADER.len() {
                self.sauce_dropping = true;
            }
            return;
        }

        // Mismatch: release the withheld prefix then retry this byte
        // from the start of the header
        if self.sauce_matched > 0 {
            payload.put_slice(&SAUCE_HEADER[..self.sauce_matched]);
            self.sauce_matched = 0;
            if byte == SAUCE_HEADER[0] {
                self.sauce_matched = 1;
                return;
            }
        }
        payload.put_u8(byte);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_plain_payload_passes() {
        let mut filter = TelnetFilter::new();
        let out = filter.process(b"hello world");
        assert_eq!(&out.payload[..], b"hello world");
        assert!(out.responses.is_empty());
    }

    #[test]
    fn test_escaped_iac_passes_single_byte() {
        let mut filter = TelnetFilter::new();
        let out = filter.process(&[b'a', IAC, IAC, b'b']);
        assert_eq!(&out.payload[..], &[b'a', 0xFF, b'b']);
    }

    #[test]
    fn test_will_terminal_type_answered() {
        let mut filter = TelnetFilter::new();
        let out = filter.process(&[IAC, WILL, OPT_TERMINAL_TYPE]);
        assert!(out.payload.is_empty());
        assert_eq!(&out.responses[..], &[IAC, WILL, OPT_TERMINAL_TYPE]);
    }

    #[test]
    fn test_unknown_do_refused() {
        let mut filter = TelnetFilter::new();
        let out = filter.process(&[IAC, DO, 99]);
        assert_eq!(&out.responses[..], &[IAC, WONT, 99]);
    }

    #[test]
    fn test_subnegotiation_discarded() {
        let mut filter = TelnetFilter::new();
        let out = filter.process(&[b'x', IAC, SB, 24, 1, 2, 3, IAC, SE, b'y']);
        assert_eq!(&out.payload[..], b"xy");
    }

    #[test]
    fn test_truncated_sequence_resumes_across_chunks() {
        let mut filter = TelnetFilter::new();
        let first = filter.process(&[b'a', IAC]);
        assert_eq!(&first.payload[..], b"a");
        let second = filter.process(&[WILL]);
        assert!(second.payload.is_empty());
        let third = filter.process(&[OPT_ECHO, b'b']);
        assert_eq!(&third.payload[..], b"b");
        assert_eq!(&third.responses[..], &[IAC, DO, OPT_ECHO]);
    }

    #[test]
    fn test_sauce_strips_rest_of_stream() {
        let mut filter = TelnetFilter::new();
        let mut input = Vec::new();
        input.extend_from_slice(b"HELLO");
        input.extend_from_slice(&[IAC, WILL, OPT_TERMINAL_TYPE]);
        input.extend_from_slice(b"WORLD");
        input.extend_from_slice(&[0x1A]);
        input.extend_from_slice(b"SAUCE00 title and trailer");
        let out = filter.process(&input);
        assert_eq!(&out.payload[..], b"HELLOWORLD");
        assert_eq!(&out.responses[..], &[IAC, WILL, OPT_TERMINAL_TYPE]);

        // Later chunks stay swallowed for the rest of the connection
        let later = filter.process(b"more bytes");
        assert!(later.payload.is_empty());
    }

    #[test]
    fn test_sauce_header_straddles_chunks() {
        let mut filter = TelnetFilter::new();
        let first = filter.process(&[b'o', b'k', 0x1A, b'S', b'A']);
        assert_eq!(&first.payload[..], b"ok");
        let second = filter.process(b"UCE00rest");
        assert!(second.payload.is_empty());
    }

    #[test]
    fn test_sauce_partial_match_releases_bytes() {
        let mut filter = TelnetFilter::new();
        let out = filter.process(&[0x1A, b'S', b'A', b'X', b'y']);
        assert_eq!(&out.payload[..], &[0x1A, b'S', b'A', b'X', b'y']);
    }

    #[test]
    fn test_sauce_mismatch_restarts_on_sub_byte() {
        let mut filter = TelnetFilter::new();
        // The failed prefix ends on a byte that itself opens a header
        let first = filter.process(&[0x1A, b'S', 0x1A, b'S', b'A', b'U', b'C', b'E', b'0', b'0']);
        assert_eq!(&first.payload[..], &[0x1A, b'S']);
        let second = filter.process(b"anything");
        assert!(second.payload.is_empty());
    }
}
