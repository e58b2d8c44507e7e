//! Synthetic ELF32 images for tests.
//!
//! Builds small section-only ELF files with `object::elf` header structs.
//! Gaps between sections are filled with `PADDING` so tests can tell whether
//! anything outside the section contents was touched.

#![allow(dead_code)]

use object::elf;
use object::endian::{U16, U32};
use object::pod::bytes_of;
use object::Endianness;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const PADDING: u8 = 0xa5;
pub const CODE: u32 = elf::SHF_ALLOC | elf::SHF_EXECINSTR;

const HEADER_SIZE: usize = 52;
const SECTION_HEADER_SIZE: usize = 40;

struct FixtureSection {
    name: &'static str,
    kind: u32,
    flags: u32,
    address: u32,
    size: u32,
    link: u32,
    data: Vec<u8>,
}

pub struct ElfBuilder {
    endian: Endianness,
    machine: u16,
    version: u8,
    sections: Vec<FixtureSection>,
}

/// Where a section landed in the built image.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub offset: usize,
    pub size: usize,
}

impl ElfBuilder {
    pub fn arm() -> Self {
        Self {
            endian: Endianness::Little,
            machine: elf::EM_ARM,
            version: elf::EV_CURRENT,
            sections: Vec::new(),
        }
    }

    pub fn endian(mut self, endian: Endianness) -> Self {
        self.endian = endian;
        self
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn section(mut self, name: &'static str, flags: u32, address: u32, data: Vec<u8>) -> Self {
        self.sections.push(FixtureSection {
            name,
            kind: elf::SHT_PROGBITS,
            flags,
            address,
            size: data.len() as u32,
            link: 0,
            data,
        });
        self
    }

    pub fn nobits(mut self, name: &'static str, flags: u32, address: u32, size: u32) -> Self {
        self.sections.push(FixtureSection {
            name,
            kind: elf::SHT_NOBITS,
            flags,
            address,
            size,
            link: 0,
            data: Vec::new(),
        });
        self
    }

    /// Adds a symbol table whose `sh_link` points at `link`, which need not
    /// be a valid section index.
    pub fn symtab(mut self, link: u32, data: Vec<u8>) -> Self {
        self.sections.push(FixtureSection {
            name: ".symtab",
            kind: elf::SHT_SYMTAB,
            flags: 0,
            address: 0,
            size: data.len() as u32,
            link,
            data,
        });
        self
    }

    /// Encodes `words` in the builder's byte order, followed by `tail`.
    pub fn words(&self, words: &[u32], tail: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        for word in words {
            match self.endian {
                Endianness::Little => data.extend_from_slice(&word.to_le_bytes()),
                Endianness::Big => data.extend_from_slice(&word.to_be_bytes()),
            }
        }
        data.extend_from_slice(tail);
        data
    }

    /// Returns the image and the placement of each added section.
    pub fn build(&self) -> (Vec<u8>, Vec<Placement>) {
        let e = self.endian;
        let u16 = |v: u16| U16::new(e, v);
        let u32 = |v: u32| U32::new(e, v);

        let mut buffer = vec![0u8; HEADER_SIZE];
        let mut placements = Vec::new();
        for section in &self.sections {
            pad_to(&mut buffer, 8);
            placements.push(Placement {
                offset: buffer.len(),
                size: section.size as usize,
            });
            buffer.extend_from_slice(&section.data);
        }

        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for section in &self.sections {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(section.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab\0");

        pad_to(&mut buffer, 4);
        let shstrtab_offset = buffer.len();
        buffer.extend_from_slice(&shstrtab);

        pad_to(&mut buffer, 4);
        let shoff = buffer.len();
        let shnum = self.sections.len() + 2;

        let null = elf::SectionHeader32::<Endianness> {
            sh_name: u32(0),
            sh_type: u32(elf::SHT_NULL),
            sh_flags: u32(0),
            sh_addr: u32(0),
            sh_offset: u32(0),
            sh_size: u32(0),
            sh_link: u32(0),
            sh_info: u32(0),
            sh_addralign: u32(0),
            sh_entsize: u32(0),
        };
        buffer.extend_from_slice(bytes_of(&null));

        for ((section, placement), name) in self.sections.iter().zip(&placements).zip(&name_offsets) {
            let header = elf::SectionHeader32::<Endianness> {
                sh_name: u32(*name),
                sh_type: u32(section.kind),
                sh_flags: u32(section.flags),
                sh_addr: u32(section.address),
                sh_offset: u32(placement.offset as u32),
                sh_size: u32(section.size),
                sh_link: u32(section.link),
                sh_info: u32(0),
                sh_addralign: u32(4),
                sh_entsize: u32(0),
            };
            buffer.extend_from_slice(bytes_of(&header));
        }

        let strtab = elf::SectionHeader32::<Endianness> {
            sh_name: u32(shstrtab_name),
            sh_type: u32(elf::SHT_STRTAB),
            sh_flags: u32(0),
            sh_addr: u32(0),
            sh_offset: u32(shstrtab_offset as u32),
            sh_size: u32(shstrtab.len() as u32),
            sh_link: u32(0),
            sh_info: u32(0),
            sh_addralign: u32(1),
            sh_entsize: u32(0),
        };
        buffer.extend_from_slice(bytes_of(&strtab));

        let header = elf::FileHeader32::<Endianness> {
            e_ident: elf::Ident {
                magic: elf::ELFMAG,
                class: elf::ELFCLASS32,
                data: match e {
                    Endianness::Little => elf::ELFDATA2LSB,
                    Endianness::Big => elf::ELFDATA2MSB,
                },
                version: self.version,
                os_abi: elf::ELFOSABI_SYSV,
                abi_version: 0,
                padding: [0; 7],
            },
            e_type: u16(elf::ET_EXEC),
            e_machine: u16(self.machine),
            e_version: u32(elf::EV_CURRENT.into()),
            e_entry: u32(0),
            e_phoff: u32(0),
            e_shoff: u32(shoff as u32),
            e_flags: u32(0),
            e_ehsize: u16(HEADER_SIZE as u16),
            e_phentsize: u16(0),
            e_phnum: u16(0),
            e_shentsize: u16(SECTION_HEADER_SIZE as u16),
            e_shnum: u16(shnum as u16),
            e_shstrndx: u16(shnum as u16 - 1),
        };
        buffer[..HEADER_SIZE].copy_from_slice(bytes_of(&header));

        (buffer, placements)
    }
}

fn pad_to(buffer: &mut Vec<u8>, align: usize) {
    while buffer.len() % align != 0 {
        buffer.push(PADDING);
    }
}

/// A typical LPC image: vector table at the start of `.text`, data behind it.
pub fn lpc_image(vectors: &[u32; 8]) -> (ElfBuilder, Vec<u8>, Vec<Placement>) {
    let builder = ElfBuilder::arm();
    let text = builder.words(vectors, &[0x70, 0x47, 0x00, 0xbf, 0xfe, 0xe7, 0x00, 0xbf]);
    let builder = builder
        .section(".text", CODE, 0, text)
        .section(".rodata", elf::SHF_ALLOC, 0x100, b"version 1.0\0".to_vec())
        .section(".data", elf::SHF_ALLOC | elf::SHF_WRITE, 0x1000_0000, vec![1, 2, 3, 4, 5])
        .nobits(".bss", elf::SHF_ALLOC | elf::SHF_WRITE, 0x1000_0008, 0x40)
        .section(".comment", 0, 0, b"GCC: (test) 13.2\0".to_vec());
    let (image, placements) = builder.build();
    (builder, image, placements)
}

/// Writes `image` into a fresh temporary directory.
pub fn write_temp(image: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("firmware.elf");
    std::fs::write(&path, image).unwrap();
    (dir, path)
}

pub fn read_word(image: &[u8], offset: usize, endian: Endianness) -> u32 {
    let bytes: [u8; 4] = image[offset..offset + 4].try_into().unwrap();
    match endian {
        Endianness::Little => u32::from_le_bytes(bytes),
        Endianness::Big => u32::from_be_bytes(bytes),
    }
}

pub fn table_sum(image: &[u8], offset: usize, endian: Endianness) -> u32 {
    (0..8).fold(0u32, |acc, i| acc.wrapping_add(read_word(image, offset + 4 * i, endian)))
}

/// Offsets at which `before` and `after` differ.
pub fn changed_offsets(before: &[u8], after: &[u8]) -> Vec<usize> {
    assert_eq!(before.len(), after.len(), "file length changed");
    before
        .iter()
        .zip(after)
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(i, _)| i)
        .collect()
}

pub fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}
