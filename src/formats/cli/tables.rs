//! `#~` table stream: header, row sizes and cell access.
//!
//! Only the layout of tables 0x00 (Module) through 0x20 (Assembly) is
//! modelled. Tables are stored back to back in table-id order, so locating
//! the Assembly table requires the row size of every table before it.
//! Later tables still contribute row counts to coded index widths.

use bitflags::bitflags;

use super::{MetadataError, Result};
use crate::formats::bytes::LeBytes;

pub const MODULE: u8 = 0x00;
pub const TYPE_REF: u8 = 0x01;
pub const TYPE_DEF: u8 = 0x02;
pub const FIELD_PTR: u8 = 0x03;
pub const FIELD: u8 = 0x04;
pub const METHOD_PTR: u8 = 0x05;
pub const METHOD_DEF: u8 = 0x06;
pub const PARAM_PTR: u8 = 0x07;
pub const PARAM: u8 = 0x08;
pub const INTERFACE_IMPL: u8 = 0x09;
pub const MEMBER_REF: u8 = 0x0A;
pub const CONSTANT: u8 = 0x0B;
pub const CUSTOM_ATTRIBUTE: u8 = 0x0C;
pub const FIELD_MARSHAL: u8 = 0x0D;
pub const DECL_SECURITY: u8 = 0x0E;
pub const CLASS_LAYOUT: u8 = 0x0F;
pub const FIELD_LAYOUT: u8 = 0x10;
pub const STAND_ALONE_SIG: u8 = 0x11;
pub const EVENT_MAP: u8 = 0x12;
pub const EVENT_PTR: u8 = 0x13;
pub const EVENT: u8 = 0x14;
pub const PROPERTY_MAP: u8 = 0x15;
pub const PROPERTY_PTR: u8 = 0x16;
pub const PROPERTY: u8 = 0x17;
pub const METHOD_SEMANTICS: u8 = 0x18;
pub const METHOD_IMPL: u8 = 0x19;
pub const MODULE_REF: u8 = 0x1A;
pub const TYPE_SPEC: u8 = 0x1B;
pub const IMPL_MAP: u8 = 0x1C;
pub const FIELD_RVA: u8 = 0x1D;
pub const ENC_LOG: u8 = 0x1E;
pub const ENC_MAP: u8 = 0x1F;
pub const ASSEMBLY: u8 = 0x20;
pub const ASSEMBLY_REF: u8 = 0x23;
pub const FILE: u8 = 0x26;
pub const EXPORTED_TYPE: u8 = 0x27;
pub const MANIFEST_RESOURCE: u8 = 0x28;
pub const GENERIC_PARAM: u8 = 0x2A;
pub const METHOD_SPEC: u8 = 0x2B;
pub const GENERIC_PARAM_CONSTRAINT: u8 = 0x2C;

const NOT_USED: u8 = 0xFF;
const MAX_TABLES: usize = 64;
const MODELLED_TABLES: usize = ASSEMBLY as usize + 1;

bitflags! {
    /// HeapSizes byte of the table stream header
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeapSizes: u8 {
        const WIDE_STRINGS = 0x01;
        const WIDE_GUIDS = 0x02;
        const WIDE_BLOBS = 0x04;
        const PADDING = 0x08;
        const DELTA_ONLY = 0x20;
        const EXTRA_DATA = 0x40;
        const HAS_DELETE = 0x80;
    }
}

/// Coded index families (ECMA-335 II.24.2.6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodedIndex {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    CustomAttributeType,
    ResolutionScope,
}

impl CodedIndex {
    /// Tag width and the table each tag value selects
    pub fn layout(self) -> (u32, &'static [u8]) {
        match self {
            Self::TypeDefOrRef => (2, &[TYPE_DEF, TYPE_REF, TYPE_SPEC]),
            Self::HasConstant => (2, &[FIELD, PARAM, PROPERTY]),
            Self::HasCustomAttribute => (
                5,
                &[
                    METHOD_DEF,
                    FIELD,
                    TYPE_REF,
                    TYPE_DEF,
                    PARAM,
                    INTERFACE_IMPL,
                    MEMBER_REF,
                    MODULE,
                    DECL_SECURITY,
                    PROPERTY,
                    EVENT,
                    STAND_ALONE_SIG,
                    MODULE_REF,
                    TYPE_SPEC,
                    ASSEMBLY,
                    ASSEMBLY_REF,
                    FILE,
                    EXPORTED_TYPE,
                    MANIFEST_RESOURCE,
                    GENERIC_PARAM,
                    GENERIC_PARAM_CONSTRAINT,
                    METHOD_SPEC,
                ],
            ),
            Self::HasFieldMarshal => (1, &[FIELD, PARAM]),
            Self::HasDeclSecurity => (2, &[TYPE_DEF, METHOD_DEF, ASSEMBLY]),
            Self::MemberRefParent => (3, &[TYPE_DEF, TYPE_REF, MODULE_REF, METHOD_DEF, TYPE_SPEC]),
            Self::HasSemantics => (1, &[EVENT, PROPERTY]),
            Self::MethodDefOrRef => (1, &[METHOD_DEF, MEMBER_REF]),
            Self::MemberForwarded => (1, &[FIELD, METHOD_DEF]),
            Self::CustomAttributeType => {
                (3, &[NOT_USED, NOT_USED, METHOD_DEF, MEMBER_REF, NOT_USED])
            }
            Self::ResolutionScope => (2, &[MODULE, MODULE_REF, ASSEMBLY_REF, TYPE_REF]),
        }
    }

    /// Split a raw coded value into (table, 1-based row)
    pub fn decode(self, value: u32) -> Option<(u8, u32)> {
        let (bits, tables) = self.layout();
        let tag = (value & ((1 << bits) - 1)) as usize;
        let table = *tables.get(tag)?;
        if table == NOT_USED {
            return None;
        }
        Some((table, value >> bits))
    }
}

/// Column kinds of a table row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    U16,
    U32,
    Str,
    Guid,
    Blob,
    Index(u8),
    Coded(CodedIndex),
}

use Column::*;

/// Row schema for tables 0x00..=0x20
pub fn schema(table: u8) -> &'static [Column] {
    match table {
        MODULE => &[U16, Str, Guid, Guid, Guid],
        TYPE_REF => &[Coded(CodedIndex::ResolutionScope), Str, Str],
        TYPE_DEF => &[
            U32,
            Str,
            Str,
            Coded(CodedIndex::TypeDefOrRef),
            Index(FIELD),
            Index(METHOD_DEF),
        ],
        FIELD_PTR => &[Index(FIELD)],
        FIELD => &[U16, Str, Blob],
        METHOD_PTR => &[Index(METHOD_DEF)],
        METHOD_DEF => &[U32, U16, U16, Str, Blob, Index(PARAM)],
        PARAM_PTR => &[Index(PARAM)],
        PARAM => &[U16, U16, Str],
        INTERFACE_IMPL => &[Index(TYPE_DEF), Coded(CodedIndex::TypeDefOrRef)],
        MEMBER_REF => &[Coded(CodedIndex::MemberRefParent), Str, Blob],
        // Type is a byte followed by a padding byte
        CONSTANT => &[U16, Coded(CodedIndex::HasConstant), Blob],
        CUSTOM_ATTRIBUTE => &[
            Coded(CodedIndex::HasCustomAttribute),
            Coded(CodedIndex::CustomAttributeType),
            Blob,
        ],
        FIELD_MARSHAL => &[Coded(CodedIndex::HasFieldMarshal), Blob],
        DECL_SECURITY => &[U16, Coded(CodedIndex::HasDeclSecurity), Blob],
        CLASS_LAYOUT => &[U16, U32, Index(TYPE_DEF)],
        FIELD_LAYOUT => &[U32, Index(FIELD)],
        STAND_ALONE_SIG => &[Blob],
        EVENT_MAP => &[Index(TYPE_DEF), Index(EVENT)],
        EVENT_PTR => &[Index(EVENT)],
        EVENT => &[U16, Str, Coded(CodedIndex::TypeDefOrRef)],
        PROPERTY_MAP => &[Index(TYPE_DEF), Index(PROPERTY)],
        PROPERTY_PTR => &[Index(PROPERTY)],
        PROPERTY => &[U16, Str, Blob],
        METHOD_SEMANTICS => &[U16, Index(METHOD_DEF), Coded(CodedIndex::HasSemantics)],
        METHOD_IMPL => &[
            Index(TYPE_DEF),
            Coded(CodedIndex::MethodDefOrRef),
            Coded(CodedIndex::MethodDefOrRef),
        ],
        MODULE_REF => &[Str],
        TYPE_SPEC => &[Blob],
        IMPL_MAP => &[
            U16,
            Coded(CodedIndex::MemberForwarded),
            Str,
            Index(MODULE_REF),
        ],
        FIELD_RVA => &[U32, Index(FIELD)],
        ENC_LOG => &[U32, U32],
        ENC_MAP => &[U32],
        ASSEMBLY => &[U32, U16, U16, U16, U16, U32, Blob, Str, Str],
        _ => &[],
    }
}

/// Parsed table stream with precomputed table offsets
#[derive(Debug, Clone)]
pub struct TableStream<'a> {
    data: &'a [u8],
    pub major_version: u8,
    pub minor_version: u8,
    pub heap_sizes: HeapSizes,
    pub valid: u64,
    rows: [u32; MAX_TABLES],
    offsets: [usize; MODELLED_TABLES],
    row_sizes: [usize; MODELLED_TABLES],
}

impl<'a> TableStream<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let truncated = |offset| MetadataError::Truncated { offset };

        let major_version = data.u8_at(4).ok_or(truncated(4))?;
        let minor_version = data.u8_at(5).ok_or(truncated(5))?;
        let heap_sizes = HeapSizes::from_bits_retain(data.u8_at(6).ok_or(truncated(6))?);
        let valid = data.u64_at(8).ok_or(truncated(8))?;

        let mut rows = [0u32; MAX_TABLES];
        let mut cursor = 24usize;
        for (table, count) in rows.iter_mut().enumerate() {
            if valid & (1u64 << table) != 0 {
                *count = data.u32_at(cursor).ok_or(truncated(cursor))?;
                cursor += 4;
            }
        }
        if heap_sizes.contains(HeapSizes::EXTRA_DATA) {
            cursor += 4;
        }

        let mut stream = Self {
            data,
            major_version,
            minor_version,
            heap_sizes,
            valid,
            rows,
            offsets: [0; MODELLED_TABLES],
            row_sizes: [0; MODELLED_TABLES],
        };

        for table in 0..MODELLED_TABLES {
            let row_size = schema(table as u8)
                .iter()
                .map(|c| stream.column_size(*c))
                .sum::<usize>();
            stream.row_sizes[table] = row_size;
            stream.offsets[table] = cursor;
            cursor = cursor.saturating_add(row_size.saturating_mul(rows[table] as usize));
        }

        // Every modelled table must fit inside the stream
        if cursor > data.len() {
            return Err(truncated(cursor));
        }

        Ok(stream)
    }

    pub fn row_count(&self, table: u8) -> u32 {
        self.rows.get(table as usize).copied().unwrap_or(0)
    }

    pub fn row_size(&self, table: u8) -> usize {
        self.row_sizes.get(table as usize).copied().unwrap_or(0)
    }

    fn heap_index_size(&self, flag: HeapSizes) -> usize {
        if self.heap_sizes.contains(flag) {
            4
        } else {
            2
        }
    }

    pub fn column_size(&self, column: Column) -> usize {
        match column {
            U16 => 2,
            U32 => 4,
            Str => self.heap_index_size(HeapSizes::WIDE_STRINGS),
            Guid => self.heap_index_size(HeapSizes::WIDE_GUIDS),
            Blob => self.heap_index_size(HeapSizes::WIDE_BLOBS),
            Index(table) => {
                if self.row_count(table) < (1 << 16) {
                    2
                } else {
                    4
                }
            }
            Coded(kind) => {
                let (bits, tables) = kind.layout();
                let max_rows = tables
                    .iter()
                    .filter(|&&t| t != NOT_USED)
                    .map(|&t| self.row_count(t))
                    .max()
                    .unwrap_or(0);
                if max_rows < (1u32 << (16 - bits)) {
                    2
                } else {
                    4
                }
            }
        }
    }

    /// Read column `column` of the 1-based `row` in `table`
    pub fn cell(&self, table: u8, row: u32, column: usize) -> Result<u32> {
        let bad_row = MetadataError::BadRow { table, row };
        if table as usize >= MODELLED_TABLES || row == 0 || row > self.row_count(table) {
            return Err(bad_row);
        }
        let columns = schema(table);
        let kind = *columns.get(column).ok_or(bad_row)?;

        let row_start = self.offsets[table as usize]
            + (row as usize - 1) * self.row_sizes[table as usize];
        let offset = row_start
            + columns[..column]
                .iter()
                .map(|c| self.column_size(*c))
                .sum::<usize>();

        let value = match self.column_size(kind) {
            2 => self.data.u16_at(offset).map(u32::from),
            _ => self.data.u32_at(offset),
        };
        value.ok_or(MetadataError::Truncated { offset })
    }
}
