const CRC_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;

    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;

        while k < 8 {
            if c & 1 == 1 {
                c = 0xedb88320u32 ^ (c >> 1);
            } else {
                c >>= 1;
            }
            k += 1;
        }

        table[n] = c;
        n += 1;
    }

    table
}

/// Incremental CRC-32/ISO-HDLC, the checksum PNG stores after every chunk.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    pub fn new() -> Self {
        Self { state: 0xffffffff }
    }

    pub fn update(&mut self, buf: &[u8]) -> &mut Self {
        let mut c = self.state;
        for &b in buf {
            c = CRC_TABLE[((c ^ u32::from(b)) & 0xff) as usize] ^ (c >> 8);
        }
        self.state = c;
        self
    }

    pub fn finalize(&self) -> u32 {
        self.state ^ 0xffffffff
    }
}

pub fn crc32(data: &[u8]) -> u32 {
    Crc32::new().update(data).finalize()
}

/// CRC of a chunk, computed over its 4-byte type followed by its body.
pub fn chunk_crc(chunk_type: u32, body: &[u8]) -> u32 {
    Crc32::new().update(&chunk_type.to_be_bytes()).update(body).finalize()
}

pub fn verify_crc(chunk_type: u32, body: &[u8], expected: u32) -> bool {
    chunk_crc(chunk_type, body) == expected
}
