//! Bus doubles for the driver tests.

use std::collections::VecDeque;

use embedded_hal_1::delay::DelayUs;
use embedded_hal_1::spi::{self, ErrorKind, ErrorType, Operation, SpiDevice};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockError;

impl spi::Error for MockError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Records every transaction and answers reads from a script.
#[derive(Default)]
pub struct MockSpi {
    /// Bytes clocked out, one entry per transaction.
    pub transactions: Vec<Vec<u8>>,
    /// Bytes clocked in by read operations, in order. Empty reads as 0.
    responses: VecDeque<u8>,
    fail: bool,
}

impl MockSpi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        MockSpi {
            fail: true,
            ..Self::default()
        }
    }

    pub fn respond(&mut self, bytes: &[u8]) {
        self.responses.extend(bytes.iter().copied());
    }

    fn next(&mut self) -> u8 {
        self.responses.pop_front().unwrap_or(0)
    }
}

impl ErrorType for MockSpi {
    type Error = MockError;
}

impl SpiDevice for MockSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        if self.fail {
            return Err(MockError);
        }
        let mut written = Vec::new();
        for op in operations.iter_mut() {
            match op {
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        written.push(0);
                        *b = self.next();
                    }
                }
                Operation::Write(buf) => written.extend_from_slice(buf),
                Operation::Transfer(read, write) => {
                    written.extend_from_slice(write);
                    for b in read.iter_mut() {
                        *b = self.next();
                    }
                }
                Operation::TransferInPlace(buf) => {
                    for b in buf.iter_mut() {
                        written.push(*b);
                        *b = self.next();
                    }
                }
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }
        self.transactions.push(written);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockDelay {
    pub elapsed_us: u64,
}

impl DelayUs for MockDelay {
    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += u64::from(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_us += u64::from(ms) * 1000;
    }
}
