//! String Table (EXI 7.3).
//!
//! Assigns compact identifiers to URIs, local names and values so repeated
//! strings are written as short back-references. Partitions:
//!
//! - URI: pre-populated with `""`, the XML namespace and the XSI namespace
//! - local-name: one partition per URI
//! - value: one global partition plus one local partition per qualified name
//!
//! Lifecycle: one table per encoded or decoded buffer. Encoder and decoder
//! insert in exactly the same order, so identifiers agree on both sides.

use std::rc::Rc;

use crate::bitstream::{BitReader, BitWriter};
use crate::qname::{QName, XML_NS, XSI_NS};
use crate::{Error, FastHashMap, Result, bit_width, n_bit_unsigned_integer, string, unsigned_integer};

/// Ab dieser Größe wechselt eine Partition von linearer Suche auf HashMap.
const PARTITION_LINEAR_THRESHOLD: usize = 64;

/// String → compact id mapping. Kleine Partitionen werden linear durchsucht,
/// die HashMap wird erst ab [`PARTITION_LINEAR_THRESHOLD`] Einträgen angelegt.
#[derive(Default)]
struct Partition {
    entries: Vec<Rc<str>>,
    lookup: Option<FastHashMap<Rc<str>, usize>>,
}

impl Partition {
    fn with_entries(values: &[&str]) -> Self {
        let mut partition = Self::default();
        for value in values {
            partition.add(value);
        }
        partition
    }

    #[inline]
    fn lookup(&self, value: &str) -> Option<usize> {
        match &self.lookup {
            Some(map) => map.get(value).copied(),
            None => self.entries.iter().position(|e| &**e == value),
        }
    }

    fn add(&mut self, value: &str) -> usize {
        if let Some(existing) = self.lookup(value) {
            return existing;
        }
        let id = self.entries.len();
        let rc: Rc<str> = value.into();

        if self.lookup.is_none() && id + 1 >= PARTITION_LINEAR_THRESHOLD {
            let mut map = FastHashMap::with_capacity_and_hasher(id + 1, Default::default());
            for (i, e) in self.entries.iter().enumerate() {
                map.insert(Rc::clone(e), i);
            }
            map.insert(Rc::clone(&rc), id);
            self.lookup = Some(map);
        } else if let Some(map) = &mut self.lookup {
            map.insert(Rc::clone(&rc), id);
        }

        self.entries.push(rc);
        id
    }

    fn get(&self, id: usize) -> Option<&Rc<str>> {
        self.entries.get(id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Per-buffer string table.
pub struct StringTable {
    uris: Partition,
    /// Indexed by URI id.
    local_names: Vec<Partition>,
    global_values: Partition,
    local_values: FastHashMap<QName, Partition>,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTable {
    pub fn new() -> Self {
        let uris = Partition::with_entries(&["", XML_NS, XSI_NS]);
        let local_names = (0..uris.len()).map(|_| Partition::default()).collect();
        Self {
            uris,
            local_names,
            global_values: Partition::default(),
            local_values: FastHashMap::default(),
        }
    }

    /// Writes a value (EXI 7.3.3): local hit `0` + local id, global hit
    /// `1` + global id, miss: length + 2 followed by the characters.
    ///
    /// Non-empty misses are added to the global and the local partition.
    pub fn encode_value(&mut self, writer: &mut BitWriter, qname: &QName, value: &str) {
        if let Some(local) = self.local_values.get(qname)
            && let Some(id) = local.lookup(value)
        {
            unsigned_integer::encode(writer, 0);
            n_bit_unsigned_integer::encode(writer, id as u64, bit_width::for_count(local.len()));
            return;
        }
        if let Some(id) = self.global_values.lookup(value) {
            unsigned_integer::encode(writer, 1);
            n_bit_unsigned_integer::encode(
                writer,
                id as u64,
                bit_width::for_count(self.global_values.len()),
            );
            return;
        }
        string::encode_with_offset(writer, value, 2);
        self.add_value(qname, value);
    }

    /// Reads a value written by [`encode_value`](Self::encode_value).
    pub fn decode_value(
        &mut self,
        reader: &mut BitReader,
        qname: &QName,
        max_len: Option<usize>,
    ) -> Result<String> {
        match unsigned_integer::decode(reader)? {
            0 => {
                let local = self
                    .local_values
                    .get(qname)
                    .ok_or(Error::InvalidCompactId(0))?;
                let id = n_bit_unsigned_integer::decode(reader, bit_width::for_count(local.len()))?
                    as usize;
                local
                    .get(id)
                    .map(|s| s.to_string())
                    .ok_or(Error::InvalidCompactId(id))
            }
            1 => {
                let n = bit_width::for_count(self.global_values.len());
                let id = n_bit_unsigned_integer::decode(reader, n)? as usize;
                self.global_values
                    .get(id)
                    .map(|s| s.to_string())
                    .ok_or(Error::InvalidCompactId(id))
            }
            len => {
                let value = string::decode_chars(reader, len - 2, max_len)?;
                self.add_value(qname, &value);
                Ok(value)
            }
        }
    }

    fn add_value(&mut self, qname: &QName, value: &str) {
        if value.is_empty() {
            return;
        }
        self.global_values.add(value);
        self.local_values.entry(qname.clone()).or_default().add(value);
    }

    /// Writes a qualified name (EXI 7.1.7) through the URI and local-name
    /// partitions. Used by the self-describing wildcard encoding.
    pub fn encode_qname(&mut self, writer: &mut BitWriter, qname: &QName) {
        // URI: n-bit (count + 1), 0 = Miss
        let n = bit_width::for_count(self.uris.len() + 1);
        let uri_id = match self.uris.lookup(&qname.uri) {
            Some(id) => {
                n_bit_unsigned_integer::encode(writer, id as u64 + 1, n);
                id
            }
            None => {
                n_bit_unsigned_integer::encode(writer, 0, n);
                string::encode(writer, &qname.uri);
                self.local_names.push(Partition::default());
                self.uris.add(&qname.uri)
            }
        };

        // Local name: Hit = 0 + n-bit id, Miss = Länge + 1
        let partition = &mut self.local_names[uri_id];
        match partition.lookup(&qname.local_name) {
            Some(id) => {
                unsigned_integer::encode(writer, 0);
                n_bit_unsigned_integer::encode(writer, id as u64, bit_width::for_count(partition.len()));
            }
            None => {
                string::encode_with_offset(writer, &qname.local_name, 1);
                partition.add(&qname.local_name);
            }
        }
    }

    /// Reads a qualified name written by [`encode_qname`](Self::encode_qname).
    pub fn decode_qname(&mut self, reader: &mut BitReader, max_len: Option<usize>) -> Result<QName> {
        let n = bit_width::for_count(self.uris.len() + 1);
        let uri_code = n_bit_unsigned_integer::decode(reader, n)? as usize;
        let (uri_id, uri) = if uri_code == 0 {
            let uri = string::decode(reader, max_len)?;
            self.local_names.push(Partition::default());
            (self.uris.add(&uri), Rc::<str>::from(uri))
        } else {
            let id = uri_code - 1;
            let uri = self.uris.get(id).cloned().ok_or(Error::InvalidCompactId(id))?;
            (id, uri)
        };

        let partition = &mut self.local_names[uri_id];
        let local = match unsigned_integer::decode(reader)? {
            0 => {
                let id = n_bit_unsigned_integer::decode(reader, bit_width::for_count(partition.len()))?
                    as usize;
                partition.get(id).cloned().ok_or(Error::InvalidCompactId(id))?
            }
            len => {
                let local = string::decode_chars(reader, len - 1, max_len)?;
                let id = partition.add(&local);
                Rc::clone(&partition.entries[id])
            }
        };
        Ok(QName::new(&*uri, &*local))
    }
}
