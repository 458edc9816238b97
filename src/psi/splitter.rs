//! Packing of an entry list plus a global descriptor list into long-section
//! payloads, and the reverse.
//!
//! Payload shape shared by the tables using this module:
//!
//! ```text
//! prefix (table fields, u8 entry count) | entry* | global loop length | global descriptors
//! entry = fixed fields | loop length | descriptors
//! ```
//!
//! An entry's descriptor list never straddles two sections. The first entry
//! of a section is always kept, even when only part of its descriptors fit,
//! so every section makes progress. Global descriptors are placed only once
//! the entry list is exhausted; earlier sections carry an empty global loop.

use log::{trace, warn};

use crate::constants::MAX_SECTIONS_PER_TABLE;
use crate::descriptors::{DescriptorList, LengthField};
use crate::error::{PsiError, Result};
use crate::field::put_u16;

/// A table entry: a fixed-size record followed by a descriptor loop.
pub trait EntryCodec: Sized {
    /// Discriminates table variants sharing this entry layout but not the
    /// meaning of every bit.
    type Variant: Copy;

    /// Size of the fixed record, descriptor loop length excluded.
    const FIXED_SIZE: usize;
    /// Width of the descriptor loop length field.
    const LOOP: LengthField;

    /// `out` is exactly `FIXED_SIZE` bytes.
    fn write_fixed(&self, variant: Self::Variant, out: &mut [u8]);
    /// `data` is exactly `FIXED_SIZE` bytes. The descriptor list of the
    /// returned entry is empty.
    fn read_fixed(variant: Self::Variant, data: &[u8]) -> Result<Self>;

    fn descriptors(&self) -> &DescriptorList;
    fn descriptors_mut(&mut self) -> &mut DescriptorList;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongTableLayout {
    /// Payload bytes per section.
    pub capacity: usize,
    pub global_loop: LengthField,
}

/// Positions carried from one section to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitState {
    pub next_entry: usize,
    pub next_global: usize,
}

/// Everything that stays fixed while sections are produced.
pub struct SplitInput<'a, E: EntryCodec> {
    /// Table-level payload prefix, entry count placeholder included.
    pub prefix: &'a [u8],
    /// Offset of the u8 entry count inside `prefix`.
    pub count_offset: usize,
    pub entries: &'a [E],
    pub variant: E::Variant,
    pub global: &'a DescriptorList,
    pub layout: LongTableLayout,
}

impl<E: EntryCodec> SplitInput<'_, E> {
    fn is_done(&self, state: SplitState) -> bool {
        state.next_entry >= self.entries.len() && state.next_global >= self.global.len()
    }
}

/// Builds one section payload starting from `state`.
pub fn fill_section<E: EntryCodec>(input: &SplitInput<'_, E>, state: SplitState) -> (Vec<u8>, SplitState) {
    let cap = input.layout.capacity;
    let mut buf = vec![0u8; cap];
    buf[..input.prefix.len()].copy_from_slice(input.prefix);
    let mut pos = input.prefix.len();
    let mut count: u8 = 0;
    let mut next_entry = state.next_entry;

    // Room for the fixed part, its loop length and the global loop length.
    while next_entry < input.entries.len()
        && count < u8::MAX
        && cap - pos >= E::FIXED_SIZE + 2 + 2
    {
        let entry = &input.entries[next_entry];
        let descs = entry.descriptors();
        let saved = pos;

        entry.write_fixed(input.variant, &mut buf[pos..pos + E::FIXED_SIZE]);
        pos += E::FIXED_SIZE;
        let (next_desc, written) = descs.serialize_loop(&mut buf[pos..cap - 2], 0, E::LOOP);

        if count == 0 || next_desc >= descs.len() {
            if next_desc < descs.len() {
                warn!(
                    "entry {next_entry}: {} of {} descriptors do not fit in a section, dropped",
                    descs.len() - next_desc,
                    descs.len()
                );
            }
            pos += written;
            count += 1;
            next_entry += 1;
        } else {
            // Deferred whole to the next section.
            pos = saved;
            break;
        }
    }
    buf[input.count_offset] = count;

    // Global descriptors wait until every entry is placed.
    let next_global = if next_entry < input.entries.len() {
        put_u16(&mut buf, pos, input.layout.global_loop.encode(0));
        pos += 2;
        state.next_global
    } else {
        let (next_global, written) =
            input
                .global
                .serialize_loop(&mut buf[pos..cap], state.next_global, input.layout.global_loop);
        pos += written;
        next_global
    };
    buf.truncate(pos);

    (
        buf,
        SplitState {
            next_entry,
            next_global,
        },
    )
}

/// Produces section payloads until every entry and global descriptor is
/// placed. At least one payload is always returned.
pub fn split_payloads<E: EntryCodec>(input: &SplitInput<'_, E>) -> Vec<Vec<u8>> {
    let mut payloads = Vec::new();
    let mut state = SplitState::default();

    loop {
        let (payload, next) = fill_section(input, state);
        if next == state && !payloads.is_empty() {
            warn!(
                "{} entries and {} global descriptors cannot fit in any section, dropped",
                input.entries.len() - state.next_entry,
                input.global.len() - state.next_global
            );
            break;
        }
        trace!(
            "section {}: entries {}..{}, global descriptors {}..{}, {} bytes",
            payloads.len(),
            state.next_entry,
            next.next_entry,
            state.next_global,
            next.next_global,
            payload.len()
        );
        payloads.push(payload);
        state = next;

        if input.is_done(state) {
            break;
        }
        if payloads.len() == MAX_SECTIONS_PER_TABLE {
            warn!(
                "table needs more than {MAX_SECTIONS_PER_TABLE} sections, {} entries and {} global descriptors dropped",
                input.entries.len() - state.next_entry,
                input.global.len() - state.next_global
            );
            break;
        }
    }
    payloads
}

/// Reads `count` entries and then the global loop from one section body
/// (the payload after the table prefix). Entries and descriptors are
/// appended to what earlier sections produced.
///
/// Descriptor loop lengths overrunning the section are capped; missing
/// entries or a missing global loop length are errors.
pub fn parse_section_body<E: EntryCodec>(
    data: &[u8],
    count: usize,
    variant: E::Variant,
    global_loop: LengthField,
    entries: &mut Vec<E>,
    global: &mut DescriptorList,
) -> Result<()> {
    let mut pos = 0;
    let mut remaining = count;

    while remaining > 0 && data.len() - pos >= E::FIXED_SIZE + 2 {
        let mut entry = E::read_fixed(variant, &data[pos..pos + E::FIXED_SIZE])?;
        pos += E::FIXED_SIZE;
        // At least the loop length is present, checked above.
        pos += entry
            .descriptors_mut()
            .deserialize_loop(&data[pos..], E::LOOP)
            .unwrap_or(2);
        entries.push(entry);
        remaining -= 1;
    }

    if remaining > 0 {
        return Err(PsiError::TableInconsistent(format!(
            "section declares {count} entries but only {} fit in its payload",
            count - remaining
        )));
    }

    global
        .deserialize_loop(&data[pos..], global_loop)
        .ok_or_else(|| PsiError::truncated("global descriptor loop length", 2, data.len() - pos))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::Descriptor;
    use crate::field::get_u16;

    /// 2-byte id + descriptors, standard 12-bit loop.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Item {
        id: u16,
        descs: DescriptorList,
    }

    impl EntryCodec for Item {
        type Variant = ();
        const FIXED_SIZE: usize = 2;
        const LOOP: LengthField = LengthField::STANDARD;

        fn write_fixed(&self, _: (), out: &mut [u8]) {
            put_u16(out, 0, self.id);
        }

        fn read_fixed(_: (), data: &[u8]) -> Result<Self> {
            Ok(Item {
                id: get_u16(data, 0),
                descs: DescriptorList::new(),
            })
        }

        fn descriptors(&self) -> &DescriptorList {
            &self.descs
        }

        fn descriptors_mut(&mut self) -> &mut DescriptorList {
            &mut self.descs
        }
    }

    fn item(id: u16, desc_payloads: &[usize]) -> Item {
        Item {
            id,
            descs: desc_payloads
                .iter()
                .map(|&n| Descriptor::new(0x80, vec![id as u8; n]))
                .collect(),
        }
    }

    fn input<'a>(items: &'a [Item], global: &'a DescriptorList, capacity: usize) -> SplitInput<'a, Item> {
        SplitInput {
            prefix: &[0xAA, 0x00],
            count_offset: 1,
            entries: items,
            variant: (),
            global,
            layout: LongTableLayout {
                capacity,
                global_loop: LengthField::STANDARD,
            },
        }
    }

    fn reassemble(payloads: &[Vec<u8>]) -> (Vec<Item>, DescriptorList) {
        let mut items = Vec::new();
        let mut global = DescriptorList::new();
        for p in payloads {
            assert_eq!(p[0], 0xAA);
            parse_section_body::<Item>(&p[2..], p[1] as usize, (), LengthField::STANDARD, &mut items, &mut global)
                .unwrap();
        }
        (items, global)
    }

    #[test]
    fn test_empty_table_yields_one_section() {
        let global = DescriptorList::new();
        let payloads = split_payloads(&input(&[], &global, 64));
        assert_eq!(payloads, vec![vec![0xAA, 0x00, 0xF0, 0x00]]);
    }

    #[test]
    fn test_entry_deferred_whole_to_next_section() {
        // Each item: 2 fixed + 2 loop + 12 descriptor bytes = 16 bytes.
        let items: Vec<Item> = (0..5).map(|i| item(i, &[10])).collect();
        let global = DescriptorList::new();
        // 2 prefix + 3 * 16 + 2 global length = 52
        let payloads = split_payloads(&input(&items, &global, 60));
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0][1], 3);
        assert_eq!(payloads[1][1], 2);

        let (back, _) = reassemble(&payloads);
        assert_eq!(back, items);
    }

    #[test]
    fn test_first_entry_always_accepted() {
        // Descriptors: 3 x 22 bytes, only one fits next to the fixed part.
        // The second item has no descriptors and fits in the remaining bytes.
        let items = vec![item(1, &[20, 20, 20]), item(2, &[])];
        let global = DescriptorList::new();
        let payloads = split_payloads(&input(&items, &global, 36));
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0][1], 2);
        let (back, _) = reassemble(&payloads);
        assert_eq!(back[0].descs.len(), 1);
        assert_eq!(back[1], items[1]);
    }

    #[test]
    fn test_global_list_continues_across_sections() {
        let items = vec![item(1, &[4])];
        let global: DescriptorList = (0..6).map(|i| Descriptor::new(0x40 + i, vec![i; 8])).collect();
        // Each global descriptor is 10 bytes.
        let payloads = split_payloads(&input(&items, &global, 40));
        assert!(payloads.len() > 1);
        assert!(payloads.iter().all(|p| p.len() <= 40));
        let (back_items, back_global) = reassemble(&payloads);
        assert_eq!(back_items, items);
        assert_eq!(back_global, global);
    }

    #[test]
    fn test_global_list_waits_for_entries() {
        let items: Vec<Item> = (0..3).map(|i| item(i, &[10])).collect();
        let global: DescriptorList = std::iter::once(Descriptor::new(0x40, vec![1, 2])).collect();
        let payloads = split_payloads(&input(&items, &global, 40));
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0][1], 2);
        // Room was left, but an entry is still pending.
        assert_eq!(&payloads[0][payloads[0].len() - 2..], &[0xF0, 0x00]);
        assert!(payloads[0].len() + 4 <= 40);

        let (_, first_only) = reassemble(&payloads[..1]);
        assert!(first_only.is_empty());
        let (back_items, back_global) = reassemble(&payloads);
        assert_eq!(back_items, items);
        assert_eq!(back_global, global);
    }

    #[test]
    fn test_unplaceable_global_descriptor_stops() {
        let global: DescriptorList = std::iter::once(Descriptor::new(0x40, vec![0; 100])).collect();
        let payloads = split_payloads(&input(&[], &global, 40));
        assert_eq!(payloads.len(), 1);
    }

    #[test]
    fn test_section_promising_too_many_entries_fails() {
        let items = vec![item(7, &[])];
        let global = DescriptorList::new();
        let mut payload = split_payloads(&input(&items, &global, 64)).remove(0);
        payload[1] = 2;
        let mut out = Vec::new();
        let mut g = DescriptorList::new();
        let err = parse_section_body::<Item>(&payload[2..], 2, (), LengthField::STANDARD, &mut out, &mut g);
        assert!(matches!(err, Err(PsiError::TableInconsistent(_))));

        // Missing global loop length.
        let body = &payload[2..payload.len() - 2];
        let err = parse_section_body::<Item>(body, 1, (), LengthField::STANDARD, &mut out, &mut g);
        assert!(err.is_err());
    }
}
