//! Udiff codec — renders a stanza list as `diff -u`-style text and parses
//! such text back into stanzas.
//!
//! A udiff is two header lines (`--- <name>`, `+++ <name>`) followed by body
//! lines that each begin with ` ` (context), `-` (removed), or `+` (added).
//! Dropping the prefix column and keeping only the not-`+` lines yields an
//! extended-JSON rendering of the left value; keeping only the not-`-` lines
//! yields the right value. Unchanged compound content is elided (`...` in
//! objects, `...(N)` runs in arrays), which keeps the text short but makes
//! it lossy on its own: decoding needs the structure being patched to fill
//! the elisions back in.
//!
//! Decoding never interprets the sigil lines directly as operations. It
//! reconciles the two sparse channel trees against the reference value and
//! re-diffs the reconciled pair, so a decoded stanza list is always exactly
//! what the diff engine would produce.

use crate::diff::{diff, lcs_pairs};
use crate::error::{DeltaError, Result};
use crate::patch::patch;
use crate::path::{Keypath, PathSegment};
use crate::sparse::{self, SparseObject, SparseSlot, SparseValue};
use crate::stanza::Stanza;
use crate::value::{compact, pretty_lines};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// The two opaque identifier strings of a udiff header. They usually name
/// files and may embed timestamps after a tab; the codec threads them
/// through without interpreting them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdiffHeader {
    pub left: String,
    pub right: String,
}

impl Default for UdiffHeader {
    fn default() -> Self {
        Self {
            left: "a".to_owned(),
            right: "b".to_owned(),
        }
    }
}

/// Read the `---`/`+++` identifier lines from udiff text, if present.
pub fn read_header(text: &str) -> Option<UdiffHeader> {
    let mut lines = text.lines();
    let left = lines.next()?.strip_prefix("--- ")?.to_owned();
    let right = lines.next()?.strip_prefix("+++ ")?.to_owned();
    Some(UdiffHeader { left, right })
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sigil {
    Common,
    Del,
    Add,
}

impl Sigil {
    fn prefix(self) -> char {
        match self {
            Sigil::Common => ' ',
            Sigil::Del => '-',
            Sigil::Add => '+',
        }
    }
}

#[derive(Debug, Clone)]
struct Band {
    sigil: Sigil,
    depth: usize,
    text: String,
}

impl Band {
    fn common(depth: usize, text: impl Into<String>) -> Self {
        Band {
            sigil: Sigil::Common,
            depth,
            text: text.into(),
        }
    }
}

/// A run of bands belonging to one object entry or array slot, tagged with
/// the channels it appears on so commas can be placed per channel.
struct Entry {
    bands: Vec<Band>,
    on_left: bool,
    on_right: bool,
}

impl Entry {
    fn common(band: Band) -> Self {
        Entry {
            bands: vec![band],
            on_left: true,
            on_right: true,
        }
    }
}

/// Render `stanzas` (a diff between `left` and `right`) as udiff text.
///
/// The stanza list drives the rendering directly; no re-diffing happens.
/// It must be the stanza list [`diff`] produces for this value pair (or a
/// list with the same meaning and ordering discipline).
pub fn udiff(left: &Value, right: &Value, stanzas: &[Stanza], header: &UdiffHeader) -> String {
    let mut bands = Vec::new();
    render_pair(left, right, stanzas, 0, &mut bands);

    let mut out = String::new();
    out.push_str("--- ");
    out.push_str(&header.left);
    out.push('\n');
    out.push_str("+++ ");
    out.push_str(&header.right);
    out.push('\n');
    for band in &bands {
        out.push(band.sigil.prefix());
        for _ in 0..band.depth {
            out.push_str("  ");
        }
        out.push_str(&band.text);
        out.push('\n');
    }
    out
}

/// Apply a udiff directly to `original` in one step.
pub fn upatch(original: &Value, text: &str) -> Result<Value> {
    let stanzas = reconstruct_diff(text, original)?;
    patch(original, &stanzas)
}

/// Apply a udiff in reverse, recovering the value it was generated from.
pub fn upatch_reverse(original: &Value, text: &str) -> Result<Value> {
    let stanzas = reconstruct_diff_reverse(text, original)?;
    patch(original, &stanzas)
}

fn render_pair(left: &Value, right: &Value, stanzas: &[Stanza], depth: usize, out: &mut Vec<Band>) {
    if stanzas.is_empty() {
        out.push(Band::common(depth, context_text(left)));
        return;
    }
    if stanzas.iter().any(|stanza| stanza.path().is_empty()) {
        // A whole-node operation: both sides dump verbatim.
        dump_bands(left, Sigil::Del, depth, "", out);
        if let Some(Stanza::Replace { value, .. }) =
            stanzas.iter().find(|stanza| stanza.path().is_empty())
        {
            dump_bands(value, Sigil::Add, depth, "", out);
        }
        return;
    }
    match (left, right) {
        (Value::Object(left_map), Value::Object(right_map)) => {
            render_object(left_map, right_map, stanzas, depth, out);
        }
        (Value::Array(left_items), Value::Array(right_items)) => {
            render_array(left_items, right_items, stanzas, depth, out);
        }
        _ => {
            dump_bands(left, Sigil::Del, depth, "", out);
            dump_bands(right, Sigil::Add, depth, "", out);
        }
    }
}

/// The one-line stand-in for an unchanged value: scalars verbatim, compound
/// values elided with enough shape to reconcile against.
fn context_text(value: &Value) -> String {
    match value {
        Value::Object(map) if map.is_empty() => "{}".to_owned(),
        Value::Object(_) => "{...}".to_owned(),
        Value::Array(items) if items.is_empty() => "[]".to_owned(),
        Value::Array(items) => format!("[...({})]", items.len()),
        scalar => compact(scalar),
    }
}

fn quote_key(key: &str) -> String {
    compact(&Value::String(key.to_owned()))
}

fn dump_bands(value: &Value, sigil: Sigil, depth: usize, prefix: &str, out: &mut Vec<Band>) {
    for (index, line) in pretty_lines(value).into_iter().enumerate() {
        let text = if index == 0 {
            format!("{prefix}{line}")
        } else {
            line
        };
        out.push(Band { sigil, depth, text });
    }
}

fn dump_entry(value: &Value, sigil: Sigil, depth: usize, prefix: &str) -> Entry {
    let mut bands = Vec::new();
    dump_bands(value, sigil, depth, prefix, &mut bands);
    Entry {
        bands,
        on_left: sigil != Sigil::Add,
        on_right: sigil != Sigil::Del,
    }
}

/// The stanzas addressing each immediate key, expressed relative to it.
fn scope_by_key(stanzas: &[Stanza]) -> BTreeMap<String, Vec<Stanza>> {
    let mut scoped: BTreeMap<String, Vec<Stanza>> = BTreeMap::new();
    for stanza in stanzas {
        if let Some((PathSegment::Key(key), relative)) = stanza.descend() {
            scoped.entry(key.clone()).or_default().push(relative);
        }
    }
    scoped
}

fn render_object(
    left: &Map<String, Value>,
    right: &Map<String, Value>,
    stanzas: &[Stanza],
    depth: usize,
    out: &mut Vec<Band>,
) {
    let scoped = scope_by_key(stanzas);

    let mut unchanged: Vec<(&String, &Value)> = Vec::new();
    for (key, value) in left {
        if !scoped.contains_key(key) && right.get(key) == Some(value) {
            unchanged.push((key, value));
        }
    }

    out.push(Band::common(depth, "{"));
    let mut entries: Vec<Entry> = Vec::new();

    // One unchanged key is shown as context; any further ones collapse into
    // a bare elision entry, recovered later by set difference.
    if let Some((key, value)) = unchanged.first() {
        let text = format!("{}: {}", quote_key(key), context_text(value));
        entries.push(Entry::common(Band::common(depth + 1, text)));
    }
    if unchanged.len() > 1 {
        entries.push(Entry::common(Band::common(depth + 1, "...")));
    }

    for (key, sub) in &scoped {
        match (left.get(key), right.get(key)) {
            (Some(old), Some(new)) => {
                let mut bands = vec![Band::common(depth + 1, format!("{}:", quote_key(key)))];
                render_pair(old, new, sub, depth + 2, &mut bands);
                entries.push(Entry {
                    bands,
                    on_left: true,
                    on_right: true,
                });
            }
            (Some(old), None) => {
                let prefix = format!("{}: ", quote_key(key));
                entries.push(dump_entry(old, Sigil::Del, depth + 1, &prefix));
            }
            (None, Some(new)) => {
                let prefix = format!("{}: ", quote_key(key));
                entries.push(dump_entry(new, Sigil::Add, depth + 1, &prefix));
            }
            (None, None) => {}
        }
    }

    finish_entries(entries, out);
    out.push(Band::common(depth, "}"));
}

/// One array position, reconstructed from the stanza list.
enum Slot<'a> {
    /// Unchanged on both sides.
    Keep(&'a Value),
    /// Replaced outright: old and new dump verbatim.
    Change(&'a Value, &'a Value),
    /// Changed internally: rendered structurally with the scoped stanzas.
    Modify(&'a Value, &'a Value, Vec<Stanza>),
    /// Present only on the left.
    Del(&'a Value),
    /// Present only on the right.
    Ins(&'a Value),
}

fn render_array(
    left: &[Value],
    right: &[Value],
    stanzas: &[Stanza],
    depth: usize,
    out: &mut Vec<Band>,
) {
    let mut deleted: BTreeSet<usize> = BTreeSet::new();
    let mut replaced: BTreeSet<usize> = BTreeSet::new();
    let mut modified: BTreeMap<usize, Vec<Stanza>> = BTreeMap::new();
    for stanza in stanzas {
        let Some((PathSegment::Index(index), relative)) = stanza.descend() else {
            continue;
        };
        if relative.path().is_empty() {
            match relative {
                Stanza::Delete { .. } => {
                    deleted.insert(*index);
                }
                Stanza::Replace { .. } => {
                    replaced.insert(*index);
                }
            }
        } else {
            modified.entry(*index).or_default().push(relative);
        }
    }

    // Deletions address original left indices; everything else addresses
    // final indices, which coincide with right-hand indices.
    let mut slots: Vec<Slot> = Vec::new();
    let mut final_index = 0usize;
    for (left_index, item) in left.iter().enumerate() {
        if deleted.contains(&left_index) {
            slots.push(Slot::Del(item));
            continue;
        }
        match right.get(final_index) {
            None => slots.push(Slot::Del(item)),
            Some(new) if replaced.contains(&final_index) => slots.push(Slot::Change(item, new)),
            Some(new) => match modified.remove(&final_index) {
                Some(sub) => slots.push(Slot::Modify(item, new, sub)),
                None => slots.push(Slot::Keep(item)),
            },
        }
        final_index += 1;
    }
    for item in right.iter().skip(final_index) {
        slots.push(Slot::Ins(item));
    }

    out.push(Band::common(depth, "["));
    let mut entries: Vec<Entry> = Vec::new();
    let mut index = 0;
    while index < slots.len() {
        if matches!(slots[index], Slot::Keep(_)) {
            let start = index;
            while index < slots.len() && matches!(slots[index], Slot::Keep(_)) {
                index += 1;
            }
            push_context_run(&slots[start..index], depth + 1, &mut entries);
            continue;
        }
        match &slots[index] {
            Slot::Del(old) => entries.push(dump_entry(old, Sigil::Del, depth + 1, "")),
            Slot::Ins(new) => entries.push(dump_entry(new, Sigil::Add, depth + 1, "")),
            Slot::Change(old, new) => {
                let mut bands = Vec::new();
                dump_bands(old, Sigil::Del, depth + 1, "", &mut bands);
                dump_bands(new, Sigil::Add, depth + 1, "", &mut bands);
                entries.push(Entry {
                    bands,
                    on_left: true,
                    on_right: true,
                });
            }
            Slot::Modify(old, new, sub) => {
                let mut bands = Vec::new();
                render_pair(old, new, sub, depth + 1, &mut bands);
                entries.push(Entry {
                    bands,
                    on_left: true,
                    on_right: true,
                });
            }
            Slot::Keep(_) => {}
        }
        index += 1;
    }
    finish_entries(entries, out);
    out.push(Band::common(depth, "]"));
}

/// Context policy for a run of unchanged elements: short runs render each
/// element, longer runs keep the first and last as anchors around a counted
/// elision.
fn push_context_run(run: &[Slot], depth: usize, entries: &mut Vec<Entry>) {
    let values: Vec<&Value> = run
        .iter()
        .filter_map(|slot| match slot {
            Slot::Keep(value) => Some(*value),
            _ => None,
        })
        .collect();
    if values.len() <= 2 {
        for value in values {
            entries.push(Entry::common(Band::common(depth, context_text(value))));
        }
    } else {
        entries.push(Entry::common(Band::common(depth, context_text(values[0]))));
        entries.push(Entry::common(Band::common(
            depth,
            format!("...({})", values.len() - 2),
        )));
        entries.push(Entry::common(Band::common(
            depth,
            context_text(values[values.len() - 1]),
        )));
    }
}

/// Place trailing commas and flush the entries. An entry takes a comma on a
/// channel exactly when a later entry appears on that channel, which keeps
/// both derived documents grammatical.
fn finish_entries(mut entries: Vec<Entry>, out: &mut Vec<Band>) {
    let commas: Vec<(bool, bool)> = (0..entries.len())
        .map(|index| {
            let rest = &entries[index + 1..];
            (
                rest.iter().any(|entry| entry.on_left),
                rest.iter().any(|entry| entry.on_right),
            )
        })
        .collect();
    for (entry, (left_comma, right_comma)) in entries.iter_mut().zip(commas) {
        commafy(&mut entry.bands, left_comma, right_comma);
    }
    for entry in entries {
        out.extend(entry.bands);
    }
}

fn commafy(bands: &mut Vec<Band>, left_comma: bool, right_comma: bool) {
    let last_left = if left_comma {
        bands.iter().rposition(|band| band.sigil != Sigil::Add)
    } else {
        None
    };
    let last_right = if right_comma {
        bands.iter().rposition(|band| band.sigil != Sigil::Del)
    } else {
        None
    };
    if let (Some(l), Some(r)) = (last_left, last_right) {
        if l == r {
            bands[l].text.push(',');
            return;
        }
    }
    // Apply from the back so the earlier index survives any split.
    let mut targets: Vec<(usize, Sigil)> = Vec::new();
    if let Some(index) = last_left {
        targets.push((index, Sigil::Del));
    }
    if let Some(index) = last_right {
        targets.push((index, Sigil::Add));
    }
    targets.sort_by(|a, b| b.0.cmp(&a.0));
    for (index, side) in targets {
        add_comma_at(bands, index, side);
    }
}

/// Append a comma on one channel at `index`. A shared line splits into a
/// `-`/`+` pair so the other channel keeps its comma-free copy.
fn add_comma_at(bands: &mut Vec<Band>, index: usize, side: Sigil) {
    if bands[index].sigil != Sigil::Common {
        bands[index].text.push(',');
        return;
    }
    let band = bands.remove(index);
    let mut removed = Band {
        sigil: Sigil::Del,
        depth: band.depth,
        text: band.text.clone(),
    };
    let mut added = Band {
        sigil: Sigil::Add,
        depth: band.depth,
        text: band.text,
    };
    match side {
        Sigil::Del => removed.text.push(','),
        _ => added.text.push(','),
    }
    bands.insert(index, added);
    bands.insert(index, removed);
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Reconstruct the stanza list a udiff encodes, resolving elisions against
/// `reference` — the structure the patch is meant to apply to.
///
/// The result is diff-exact: it equals what [`diff`] produces for the
/// reconciled value pair. Fails with [`DeltaError::Parse`] on malformed text
/// (positions refer to the derived per-channel document) and with
/// [`DeltaError::AmbiguousElision`] when an elided region cannot be
/// recovered from any concrete source.
pub fn reconstruct_diff(text: &str, reference: &Value) -> Result<Vec<Stanza>> {
    reconstruct_channels(text, reference, false)
}

/// As [`reconstruct_diff`], with the roles of `-` and `+` lines swapped:
/// the result is the diff that undoes the recorded change.
pub fn reconstruct_diff_reverse(text: &str, reference: &Value) -> Result<Vec<Stanza>> {
    reconstruct_channels(text, reference, true)
}

fn reconstruct_channels(text: &str, reference: &Value, reverse: bool) -> Result<Vec<Stanza>> {
    let body = strip_headers(text);
    let mut left_doc = String::new();
    let mut right_doc = String::new();
    for line in body.lines() {
        if line.is_empty() {
            continue;
        }
        match line.as_bytes()[0] {
            b' ' => {
                left_doc.push_str(&line[1..]);
                left_doc.push('\n');
                right_doc.push_str(&line[1..]);
                right_doc.push('\n');
            }
            b'-' => {
                left_doc.push_str(&line[1..]);
                left_doc.push('\n');
            }
            b'+' => {
                right_doc.push_str(&line[1..]);
                right_doc.push('\n');
            }
            _ => {
                return Err(DeltaError::Parse {
                    position: 0,
                    message: format!("invalid udiff line prefix in {line:?}"),
                })
            }
        }
    }
    if reverse {
        std::mem::swap(&mut left_doc, &mut right_doc);
    }
    if left_doc.trim().is_empty() && right_doc.trim().is_empty() {
        return Ok(Vec::new());
    }

    let left_sparse = sparse::parse(&left_doc)?;
    let right_sparse = sparse::parse(&right_doc)?;
    let mut path = Keypath::new();
    let (left_full, right_full) =
        reconcile_pair(&left_sparse, &right_sparse, Some(reference), &mut path)?;
    Ok(diff(&left_full, &right_full))
}

fn strip_headers(text: &str) -> &str {
    let mut rest = text;
    for marker in ["---", "+++"] {
        if rest.starts_with(marker) {
            rest = match rest.find('\n') {
                Some(position) => &rest[position + 1..],
                None => "",
            };
        }
    }
    rest
}

fn ambiguous(path: &Keypath) -> DeltaError {
    DeltaError::AmbiguousElision { path: path.clone() }
}

/// Reconcile the two channel trees in lock-step against the reference.
fn reconcile_pair(
    left: &SparseValue,
    right: &SparseValue,
    reference: Option<&Value>,
    path: &mut Keypath,
) -> Result<(Value, Value)> {
    match (left, right) {
        (SparseValue::Object(left_object), SparseValue::Object(right_object)) => {
            reconcile_objects(left_object, right_object, reference, path)
        }
        (SparseValue::Array(left_slots), SparseValue::Array(right_slots)) => {
            reconcile_arrays(left_slots, right_slots, reference, path)
        }
        _ => Ok((
            reconcile_one(left, reference, path)?,
            reconcile_one(right, reference, path)?,
        )),
    }
}

fn reconcile_objects(
    left: &SparseObject,
    right: &SparseObject,
    reference: Option<&Value>,
    path: &mut Keypath,
) -> Result<(Value, Value)> {
    let ref_map = match reference {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    };
    let left_entries: BTreeMap<&str, &SparseValue> =
        left.entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
    let right_entries: BTreeMap<&str, &SparseValue> =
        right.entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
    let mut keys: BTreeSet<&str> = left_entries.keys().copied().collect();
    keys.extend(right_entries.keys().copied());

    let mut left_out = Map::new();
    let mut right_out = Map::new();
    for key in &keys {
        let ref_sub = ref_map.and_then(|map| map.get(*key));
        path.push(PathSegment::Key((*key).to_owned()));
        match (left_entries.get(key), right_entries.get(key)) {
            (Some(l), Some(r)) => {
                let (a, b) = reconcile_pair(l, r, ref_sub, path)?;
                left_out.insert((*key).to_owned(), a);
                right_out.insert((*key).to_owned(), b);
            }
            (Some(l), None) => {
                let value = reconcile_one(l, ref_sub, path)?;
                left_out.insert((*key).to_owned(), value);
            }
            (None, Some(r)) => {
                let value = reconcile_one(r, ref_sub, path)?;
                right_out.insert((*key).to_owned(), value);
            }
            (None, None) => {}
        }
        path.pop();
    }

    // Keys hidden behind `...` are whatever the reference holds beyond the
    // mentioned ones; both channels elide the same unchanged set.
    if left.elided || right.elided {
        let Some(map) = ref_map else {
            return Err(ambiguous(path));
        };
        for (key, value) in map {
            if keys.contains(key.as_str()) {
                continue;
            }
            if left.elided {
                left_out.insert(key.clone(), value.clone());
            }
            if right.elided {
                right_out.insert(key.clone(), value.clone());
            }
        }
    }
    Ok((Value::Object(left_out), Value::Object(right_out)))
}

fn reconcile_arrays(
    left_slots: &[SparseSlot],
    right_slots: &[SparseSlot],
    reference: Option<&Value>,
    path: &mut Keypath,
) -> Result<(Value, Value)> {
    let ref_items = match reference {
        Some(Value::Array(items)) => Some(items.as_slice()),
        _ => None,
    };

    // Identical slots (elision runs, shared context, equal dumps) anchor the
    // two channels; the stretches between anchors hold the actual changes.
    let anchors = lcs_pairs(left_slots, right_slots);

    let mut left_out: Vec<Value> = Vec::new();
    let mut right_out: Vec<Value> = Vec::new();
    let mut ref_index = 0usize;
    let (mut li, mut ri) = (0usize, 0usize);
    for &(ml, mr) in &anchors {
        reconcile_segment(
            &left_slots[li..ml],
            &right_slots[ri..mr],
            ref_items,
            &mut ref_index,
            &mut left_out,
            &mut right_out,
            path,
        )?;
        match (&left_slots[ml], &right_slots[mr]) {
            (SparseSlot::Elision(count), SparseSlot::Elision(_)) => {
                let run = take_reference_run(ref_items, &mut ref_index, *count, path)?;
                left_out.extend(run.iter().cloned());
                right_out.extend(run.iter().cloned());
            }
            (SparseSlot::Value(left_value), SparseSlot::Value(right_value)) => {
                let ref_sub = ref_items.and_then(|items| items.get(ref_index));
                path.push(PathSegment::Index(left_out.len()));
                let (a, b) = reconcile_pair(left_value, right_value, ref_sub, path)?;
                path.pop();
                left_out.push(a);
                right_out.push(b);
                ref_index += 1;
            }
            _ => return Err(ambiguous(path)),
        }
        li = ml + 1;
        ri = mr + 1;
    }
    reconcile_segment(
        &left_slots[li..],
        &right_slots[ri..],
        ref_items,
        &mut ref_index,
        &mut left_out,
        &mut right_out,
        path,
    )?;
    Ok((Value::Array(left_out), Value::Array(right_out)))
}

/// Reconcile one stretch of unanchored slots.
///
/// Left-channel slots enumerate reference elements in order. The ones still
/// carrying elisions are the left halves of structural modifications; their
/// right halves are the elision-carrying right slots, paired in order. Fully
/// concrete right slots (insertions, verbatim replacements) stand alone.
fn reconcile_segment<'a>(
    left_slots: &[SparseSlot],
    right_slots: &[SparseSlot],
    ref_items: Option<&'a [Value]>,
    ref_index: &mut usize,
    left_out: &mut Vec<Value>,
    right_out: &mut Vec<Value>,
    path: &mut Keypath,
) -> Result<()> {
    let mut partial: Vec<(&SparseValue, Option<&'a Value>)> = Vec::new();
    for slot in left_slots {
        match slot {
            SparseSlot::Elision(count) => {
                let run = take_reference_run(ref_items, ref_index, *count, path)?;
                left_out.extend(run.iter().cloned());
            }
            SparseSlot::Value(value) => {
                let ref_sub = ref_items.and_then(|items| items.get(*ref_index));
                path.push(PathSegment::Index(left_out.len()));
                let reconciled = reconcile_one(value, ref_sub, path)?;
                path.pop();
                left_out.push(reconciled);
                if !value.is_concrete() {
                    partial.push((value, ref_sub));
                }
                *ref_index += 1;
            }
        }
    }

    let mut partners = partial.into_iter();
    for slot in right_slots {
        let SparseSlot::Value(value) = slot else {
            return Err(ambiguous(path));
        };
        path.push(PathSegment::Index(right_out.len()));
        let reconciled = match value.to_value() {
            Some(concrete) => concrete,
            None => {
                let Some((partner, ref_sub)) = partners.next() else {
                    return Err(ambiguous(path));
                };
                let (_, new_side) = reconcile_pair(partner, value, ref_sub, path)?;
                new_side
            }
        };
        path.pop();
        right_out.push(reconciled);
    }
    Ok(())
}

fn take_reference_run<'a>(
    ref_items: Option<&'a [Value]>,
    ref_index: &mut usize,
    count: usize,
    path: &Keypath,
) -> Result<&'a [Value]> {
    let Some(items) = ref_items else {
        return Err(ambiguous(path));
    };
    if *ref_index + count > items.len() {
        return Err(ambiguous(path));
    }
    let run = &items[*ref_index..*ref_index + count];
    *ref_index += count;
    Ok(run)
}

/// Fill the elisions of a single-channel subtree from the reference.
fn reconcile_one(
    sparse: &SparseValue,
    reference: Option<&Value>,
    path: &mut Keypath,
) -> Result<Value> {
    match sparse {
        SparseValue::Null => Ok(Value::Null),
        SparseValue::Bool(b) => Ok(Value::Bool(*b)),
        SparseValue::Number(n) => Ok(Value::Number(n.clone())),
        SparseValue::String(s) => Ok(Value::String(s.clone())),
        SparseValue::Array(slots) => {
            let ref_items = match reference {
                Some(Value::Array(items)) => Some(items.as_slice()),
                _ => None,
            };
            let mut items = Vec::new();
            let mut ref_index = 0usize;
            for slot in slots {
                match slot {
                    SparseSlot::Elision(count) => {
                        let run = take_reference_run(ref_items, &mut ref_index, *count, path)?;
                        items.extend(run.iter().cloned());
                    }
                    SparseSlot::Value(value) => {
                        let ref_sub = ref_items.and_then(|r| r.get(ref_index));
                        path.push(PathSegment::Index(items.len()));
                        let reconciled = reconcile_one(value, ref_sub, path)?;
                        path.pop();
                        items.push(reconciled);
                        ref_index += 1;
                    }
                }
            }
            Ok(Value::Array(items))
        }
        SparseValue::Object(object) => {
            let ref_map = match reference {
                Some(Value::Object(map)) => Some(map),
                _ => None,
            };
            let mut out = Map::new();
            for (key, value) in &object.entries {
                let ref_sub = ref_map.and_then(|map| map.get(key));
                path.push(PathSegment::Key(key.clone()));
                let reconciled = reconcile_one(value, ref_sub, path)?;
                path.pop();
                out.insert(key.clone(), reconciled);
            }
            if object.elided {
                let Some(map) = ref_map else {
                    return Err(ambiguous(path));
                };
                for (key, value) in map {
                    if !out.contains_key(key) {
                        out.insert(key.clone(), value.clone());
                    }
                }
            }
            Ok(Value::Object(out))
        }
    }
}
