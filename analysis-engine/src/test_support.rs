//! Minimal PE32 image builder for tests.

const FILE_ALIGNMENT: usize = 0x200;
const SECTION_ALIGNMENT: u32 = 0x1000;
const PE_OFFSET: usize = 0x40;
const OPTIONAL_HEADER_SIZE: usize = 224;
const SECTION_HEADER_SIZE: usize = 40;

pub struct TestSection {
    pub name: &'static str,
    pub data: Vec<u8>,
    pub virtual_size: Option<u32>,
}

impl TestSection {
    pub fn new(name: &'static str, data: Vec<u8>) -> Self {
        Self {
            name,
            data,
            virtual_size: None,
        }
    }

    pub fn virtual_size(mut self, size: u32) -> Self {
        self.virtual_size = Some(size);
        self
    }
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Build an i386 PE image with the given sections and no data directories.
pub fn build_pe(sections: &[TestSection]) -> Vec<u8> {
    let coff = PE_OFFSET + 4;
    let optional = coff + 20;
    let table = optional + OPTIONAL_HEADER_SIZE;
    let size_of_headers = align_up(table + SECTION_HEADER_SIZE * sections.len(), FILE_ALIGNMENT);

    let mut image = vec![0u8; size_of_headers];

    // DOS header
    image[0..2].copy_from_slice(b"MZ");
    put_u32(&mut image, 0x3c, PE_OFFSET as u32);

    // PE signature + COFF header
    image[PE_OFFSET..PE_OFFSET + 4].copy_from_slice(b"PE\0\0");
    put_u16(&mut image, coff, 0x14c);
    put_u16(&mut image, coff + 2, sections.len() as u16);
    put_u16(&mut image, coff + 16, OPTIONAL_HEADER_SIZE as u16);
    put_u16(&mut image, coff + 18, 0x0102);

    // Optional header, PE32
    let size_of_image = SECTION_ALIGNMENT * (sections.len() as u32 + 1);
    put_u16(&mut image, optional, 0x10b);
    put_u32(&mut image, optional + 28, 0x0040_0000);
    put_u32(&mut image, optional + 32, SECTION_ALIGNMENT);
    put_u32(&mut image, optional + 36, FILE_ALIGNMENT as u32);
    put_u16(&mut image, optional + 40, 4);
    put_u16(&mut image, optional + 48, 4);
    put_u32(&mut image, optional + 56, size_of_image);
    put_u32(&mut image, optional + 60, size_of_headers as u32);
    put_u16(&mut image, optional + 68, 3);
    put_u32(&mut image, optional + 92, 16);

    let mut raw_pointer = size_of_headers;
    for (i, section) in sections.iter().enumerate() {
        let header = table + i * SECTION_HEADER_SIZE;
        let mut name = [0u8; 8];
        let len = section.name.len().min(8);
        name[..len].copy_from_slice(&section.name.as_bytes()[..len]);
        image[header..header + 8].copy_from_slice(&name);

        let virtual_size = section.virtual_size.unwrap_or(section.data.len() as u32);
        put_u32(&mut image, header + 8, virtual_size);
        put_u32(&mut image, header + 12, SECTION_ALIGNMENT * (i as u32 + 1));
        put_u32(&mut image, header + 16, section.data.len() as u32);
        put_u32(&mut image, header + 20, raw_pointer as u32);
        put_u32(&mut image, header + 36, 0x6000_0020);

        image.resize(raw_pointer, 0);
        image.extend_from_slice(&section.data);
        raw_pointer = align_up(image.len(), FILE_ALIGNMENT);
    }

    image
}

/// A section whose bytes have exactly `bits` of Shannon entropy, for
/// `bits` in 0..=8: every one of `2^bits` distinct values appears equally often.
pub fn section_with_entropy(bits: u32, len: usize) -> Vec<u8> {
    let symbols = 1usize << bits;
    (0..len).map(|i| (i % symbols) as u8).collect()
}

/// One-tree forest: malicious when `max_entropy` is above 7 after scaling
/// with [`threshold_scaler`].
pub fn max_entropy_forest() -> serde_json::Value {
    serde_json::json!({
        "schema_version": "v1",
        "model_type": "random_forest",
        "n_features": 8,
        "classes": [0, 1],
        "feature_importances": [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        "trees": [ { "nodes": [
            { "feature": 2, "threshold": 0.0, "left": 1, "right": 2 },
            { "value": [1.0, 0.0] },
            { "value": [0.0, 1.0] }
        ]}]
    })
}

pub fn threshold_scaler() -> serde_json::Value {
    serde_json::json!({
        "schema_version": "v1",
        "mean": [0.0, 0.0, 7.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        "scale": [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
    })
}

/// A PE whose hottest section is full-range random-looking data.
pub fn packed_pe() -> Vec<u8> {
    build_pe(&[
        TestSection::new(".text", section_with_entropy(3, 512)),
        TestSection::new("UPX1", section_with_entropy(8, 512)),
    ])
}

pub fn plain_pe() -> Vec<u8> {
    build_pe(&[TestSection::new(".text", section_with_entropy(4, 512))])
}
