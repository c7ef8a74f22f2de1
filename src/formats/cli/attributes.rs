//! Custom attribute lookup and blob decoding (ECMA-335 II.23.3).

use super::heaps::read_compressed_u32;
use super::tables::{
    CodedIndex, ASSEMBLY, CUSTOM_ATTRIBUTE, MEMBER_REF, METHOD_DEF, TYPE_DEF, TYPE_REF,
};
use super::{Metadata, MetadataError, Result, TypeName};

const ATTRIBUTE_PROLOG: u16 = 0x0001;
const NULL_STRING: u8 = 0xFF;

impl<'a> Metadata<'a> {
    /// Declaring type of the constructor used by CustomAttribute `row`.
    ///
    /// `None` when the constructor's parent is not a plain type
    /// (e.g. a TypeSpec for a generic attribute).
    pub fn attribute_type(&self, row: u32) -> Result<Option<TypeName<'a>>> {
        let raw = self.tables.cell(CUSTOM_ATTRIBUTE, row, 1)?;
        match CodedIndex::CustomAttributeType.decode(raw) {
            Some((METHOD_DEF, method)) => {
                let owner = self.method_owner(method)?;
                Ok(Some(self.type_def_name(owner)?))
            }
            Some((MEMBER_REF, member)) => {
                let class = self.tables.cell(MEMBER_REF, member, 0)?;
                match CodedIndex::MemberRefParent.decode(class) {
                    Some((TYPE_REF, r)) => Ok(Some(self.type_ref_name(r)?)),
                    Some((TYPE_DEF, r)) => Ok(Some(self.type_def_name(r)?)),
                    _ => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    /// Value blob of the first assembly-level attribute of the given type
    pub fn assembly_attribute(&self, namespace: &str, name: &str) -> Result<Option<&'a [u8]>> {
        for row in 1..=self.tables.row_count(CUSTOM_ATTRIBUTE) {
            let parent = self.tables.cell(CUSTOM_ATTRIBUTE, row, 0)?;
            if CodedIndex::HasCustomAttribute.decode(parent) != Some((ASSEMBLY, 1)) {
                continue;
            }
            let Some(ty) = self.attribute_type(row)? else {
                continue;
            };
            if ty.namespace == namespace && ty.name == name {
                let value = self.tables.cell(CUSTOM_ATTRIBUTE, row, 2)?;
                return Ok(Some(self.blobs.get(value)?));
            }
        }
        Ok(None)
    }
}

/// Decode the first fixed argument of an attribute blob as a string.
///
/// `Ok(None)` is a serialized null string.
pub fn fixed_string_argument(blob: &[u8]) -> Result<Option<String>> {
    let prolog = blob
        .get(..2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(MetadataError::BadAttributeBlob)?;
    if prolog != ATTRIBUTE_PROLOG {
        return Err(MetadataError::BadAttributeBlob);
    }

    match blob.get(2) {
        None => Err(MetadataError::BadAttributeBlob),
        Some(&NULL_STRING) => Ok(None),
        Some(_) => {
            let (len, width) =
                read_compressed_u32(blob, 2).map_err(|_| MetadataError::BadAttributeBlob)?;
            let start = 2 + width;
            let bytes = blob
                .get(start..start + len as usize)
                .ok_or(MetadataError::BadAttributeBlob)?;
            std::str::from_utf8(bytes)
                .map(|s| Some(s.to_string()))
                .map_err(|_| MetadataError::BadAttributeBlob)
        }
    }
}
