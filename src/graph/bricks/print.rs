//! Print: pass-through that logs every packet it sees.
//!
//! One line per live packet goes to the configured writer before the burst is
//! forwarded to the opposite side, for example:
//!
//! ```text
//! print0 west->east slot=3 len=60 00 1b 21 3a 4f 5e ...
//! ```

use crate::error::Result;
use crate::graph::brick::BrickContext;
use crate::graph::burst::Burst;
use crate::graph::side::Side;
use std::fmt::Write as _;
use std::io::Write;

/// Output options for `Print`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrintFlags(u8);

impl PrintFlags {
    pub const NONE: PrintFlags = PrintFlags(0);
    /// Append a hex dump of the first bytes of each packet.
    pub const HEX: PrintFlags = PrintFlags(1 << 0);
    /// Print the direction of travel.
    pub const DIRECTION: PrintFlags = PrintFlags(1 << 1);

    #[inline]
    pub fn contains(self, other: PrintFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for PrintFlags {
    type Output = PrintFlags;

    fn bitor(self, rhs: PrintFlags) -> PrintFlags {
        PrintFlags(self.0 | rhs.0)
    }
}

/// Bytes shown by the hex dump.
const HEX_BYTES: usize = 16;

pub struct Print {
    output: Box<dyn Write + Send>,
    flags: PrintFlags,
    line: String,
}

impl Print {
    pub fn new<W>(output: W, flags: PrintFlags) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            output: Box::new(output),
            flags,
            line: String::new(),
        }
    }

    pub fn stdout(flags: PrintFlags) -> Self {
        Self::new(std::io::stdout(), flags)
    }

    pub fn flags(&self) -> PrintFlags {
        self.flags
    }

    pub fn burst(&mut self, ctx: &mut BrickContext<'_>, from: Side, burst: &mut Burst) -> Result<()> {
        for (idx, pkt) in burst.iter() {
            self.line.clear();
            let _ = write!(self.line, "{}", ctx.name());
            if self.flags.contains(PrintFlags::DIRECTION) {
                let _ = write!(self.line, " {}->{}", from, from.flip());
            }
            let _ = write!(self.line, " slot={} len={}", idx, pkt.len());
            if self.flags.contains(PrintFlags::HEX) {
                for byte in pkt.data().iter().take(HEX_BYTES) {
                    let _ = write!(self.line, " {:02x}", byte);
                }
                if pkt.len() > HEX_BYTES {
                    self.line.push_str(" ...");
                }
            }
            self.line.push('\n');
            self.output.write_all(self.line.as_bytes())?;
        }
        self.output.flush()?;
        ctx.forward(from, burst)
    }
}

impl std::fmt::Debug for Print {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Print").field("flags", &self.flags).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_use_and() {
        let flags = PrintFlags::HEX;
        assert!(flags.contains(PrintFlags::HEX));
        assert!(!flags.contains(PrintFlags::DIRECTION));
        assert!((flags | PrintFlags::DIRECTION).contains(PrintFlags::DIRECTION));
        assert!(!PrintFlags::NONE.contains(PrintFlags::HEX));
    }
}
