//! Bit-level stream reader and writer.
//!
//! Bit-packed EXI (EXI 7.1) fills each byte from the most significant bit
//! down. Only the final byte is padded; octets written in the middle of a
//! stream land at whatever bit offset the stream is at.
//!
//! A failed read leaves the [`BitReader`] unchanged, so callers can report
//! [`Error::PrematureEndOfStream`] without worrying about partial state.

use crate::{Error, Result};

/// Writes individual bits into a growable byte buffer, MSB first.
///
/// Intern wird ein u64-Akkumulator verwendet: Bits werden zuerst in `accum`
/// gesammelt und erst bei >= 8 akkumulierten Bits als volle Bytes in `buf`
/// geflusht.
pub struct BitWriter {
    buf: Vec<u8>,
    /// Akkumulator: enthält die nächsten `accum_bits` Bits (MSB = ältestes Bit).
    accum: u64,
    /// Anzahl gültiger Bits im Akkumulator (0..7 nach Flush).
    accum_bits: u8,
}

impl BitWriter {
    /// Creates a new empty `BitWriter`.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a writer with `bytes` of pre-allocated output.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            accum: 0,
            accum_bits: 0,
        }
    }

    #[inline(always)]
    fn flush_to_buf(&mut self) {
        while self.accum_bits >= 8 {
            self.accum_bits -= 8;
            self.buf.push((self.accum >> self.accum_bits) as u8);
        }
        if self.accum_bits > 0 {
            self.accum &= (1u64 << self.accum_bits) - 1;
        } else {
            self.accum = 0;
        }
    }

    /// Writes a single bit. `true` = 1, `false` = 0.
    #[inline(always)]
    pub fn write_bit(&mut self, val: bool) {
        self.accum = (self.accum << 1) | u64::from(val);
        self.accum_bits += 1;
        if self.accum_bits >= 8 {
            self.flush_to_buf();
        }
    }

    /// Writes the lower `n` bits of `val`, MSB first.
    /// When `n` is 0 this is a no-op (zero-width codes).
    #[inline]
    pub fn write_bits(&mut self, val: u64, n: u8) {
        debug_assert!(n <= 64, "bit count must be 0..=64, got {n}");
        if n == 0 {
            return;
        }
        let total = self.accum_bits as u16 + n as u16;
        if total <= 64 {
            if n < 64 {
                self.accum = (self.accum << n) | (val & ((1u64 << n) - 1));
            } else {
                // n == 64, accum_bits muss 0 sein
                self.accum = val;
            }
            self.accum_bits = total as u8;
        } else {
            // n > 57: in zwei Teilen schreiben
            let first = 64 - self.accum_bits;
            let rest = n - first;
            self.accum = (self.accum << first) | ((val >> rest) & ((1u64 << first) - 1));
            self.accum_bits = 64;
            self.flush_to_buf();
            self.accum = val & ((1u64 << rest) - 1);
            self.accum_bits = rest;
        }
        if self.accum_bits >= 8 {
            self.flush_to_buf();
        }
    }

    fn pad_last_byte(&mut self) {
        if self.accum_bits > 0 {
            self.buf.push((self.accum << (8 - self.accum_bits)) as u8);
            self.accum = 0;
            self.accum_bits = 0;
        }
    }

    /// Writes 8 bits, pushed directly when the writer sits on a byte boundary.
    #[inline(always)]
    pub fn write_octet(&mut self, val: u8) {
        if self.accum_bits == 0 {
            self.buf.push(val);
        } else {
            self.write_bits(u64::from(val), 8);
        }
    }

    /// Writes binary payloads and UTF-8 string bodies.
    pub fn write_octets(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if self.accum_bits == 0 {
            self.buf.extend_from_slice(bytes);
        } else {
            for &b in bytes {
                self.write_bits(u64::from(b), 8);
            }
        }
    }

    /// Appends the bits of a scratch writer (counted repetitions are
    /// encoded into one before their count is known).
    pub fn append(&mut self, other: BitWriter) {
        let bits = other.bit_position();
        let bytes = other.into_vec();
        let full = bits / 8;
        self.write_octets(&bytes[..full]);
        let rest = (bits % 8) as u8;
        if rest > 0 {
            self.write_bits(u64::from(bytes[full] >> (8 - rest)), rest);
        }
    }

    /// Returns the current bit position (number of bits written so far).
    pub fn bit_position(&self) -> usize {
        self.buf.len() * 8 + self.accum_bits as usize
    }

    /// Finalises the writer, padding the last byte with zero bits, and returns the buffer.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.pad_last_byte();
        self.buf
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads individual bits from a byte slice, MSB first.
///
/// Verwendet einen u64-Akkumulator; Bytes werden nur beim Refill aus `data`
/// geladen.
#[derive(Clone, Copy)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Nächstes ungelesenes Byte in data.
    byte_pos: usize,
    /// Akkumulator, linksbündig (Bit 63 = ältestes). Rechte Bits sind immer 0.
    accum: u64,
    /// Anzahl gültiger Bits im Akkumulator (0..=64).
    accum_bits: u8,
}

impl<'a> BitReader<'a> {
    /// Creates a new `BitReader` over the given byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, byte_pos: 0, accum: 0, accum_bits: 0 }
    }

    #[inline(always)]
    fn refill(&mut self) {
        while self.accum_bits <= 56 && self.byte_pos < self.data.len() {
            self.accum |= (self.data[self.byte_pos] as u64) << (56 - self.accum_bits);
            self.byte_pos += 1;
            self.accum_bits += 8;
        }
    }

    /// Reads a single bit. Returns `true` for 1, `false` for 0.
    #[inline(always)]
    pub fn read_bit(&mut self) -> Result<bool> {
        self.refill();
        if self.accum_bits == 0 {
            return Err(Error::PrematureEndOfStream);
        }
        let val = (self.accum >> 63) != 0;
        self.accum <<= 1;
        self.accum_bits -= 1;
        Ok(val)
    }

    /// Reads `n` bits and returns them as a `u64`, MSB first.
    /// When `n` is 0 this is a no-op returning 0.
    #[inline]
    pub fn read_bits(&mut self, n: u8) -> Result<u64> {
        debug_assert!(n <= 64, "bit count must be 0..=64, got {n}");
        if n == 0 {
            return Ok(0);
        }
        // Upfront-Check: State bleibt bei Fehler unverändert
        self.ensure_available(n as usize)?;

        self.refill();
        if self.accum_bits >= n {
            let val = self.accum >> (64 - n);
            self.accum = if n < 64 { self.accum << n } else { 0 };
            self.accum_bits -= n;
            Ok(val)
        } else {
            // n > 56: erst Akkumulator leeren, dann nachladen
            let first = self.accum_bits;
            let val_high = self.accum >> (64 - first);
            self.accum = 0;
            self.accum_bits = 0;

            let remaining = n - first;
            self.refill();
            let val_low = self.accum >> (64 - remaining);
            self.accum <<= remaining;
            self.accum_bits -= remaining;

            Ok((val_high << remaining) | val_low)
        }
    }

    /// Reads one octet.
    #[inline(always)]
    pub fn read_octet(&mut self) -> Result<u8> {
        if self.accum_bits >= 8 {
            let val = (self.accum >> 56) as u8;
            self.accum <<= 8;
            self.accum_bits -= 8;
            Ok(val)
        } else if self.accum_bits == 0 {
            let Some(&val) = self.data.get(self.byte_pos) else {
                return Err(Error::PrematureEndOfStream);
            };
            self.byte_pos += 1;
            Ok(val)
        } else {
            Ok(self.read_bits(8)? as u8)
        }
    }

    /// Fills `buf` with the next octets.
    pub fn read_octets(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        self.ensure_available(buf.len() * 8)?;
        if self.accum_bits == 0 {
            let end = self.byte_pos + buf.len();
            buf.copy_from_slice(&self.data[self.byte_pos..end]);
            self.byte_pos = end;
        } else {
            for slot in buf.iter_mut() {
                *slot = self.read_bits(8)? as u8;
            }
        }
        Ok(())
    }

    /// Fails with [`Error::PrematureEndOfStream`] unless at least `bits`
    /// bits remain. Used before allocating buffers for stream-declared lengths.
    #[inline]
    pub fn ensure_available(&self, bits: usize) -> Result<()> {
        if bits > self.remaining_bits() {
            Err(Error::PrematureEndOfStream)
        } else {
            Ok(())
        }
    }

    /// Returns the current bit position.
    pub fn bit_position(&self) -> usize {
        self.byte_pos * 8 - self.accum_bits as usize
    }

    /// Returns the number of bits remaining to be read.
    pub fn remaining_bits(&self) -> usize {
        (self.data.len() - self.byte_pos) * 8 + self.accum_bits as usize
    }

    /// True if every remaining bit is zero (end-of-stream padding).
    pub fn only_padding_left(&self) -> bool {
        if self.remaining_bits() >= 8 {
            return false;
        }
        self.accum == 0 && self.data[self.byte_pos..].iter().all(|&b| b == 0)
    }
}
