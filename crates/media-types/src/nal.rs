//! NAL unit helpers for AVC codec initialization data.

use bytes::{BufMut, Bytes, BytesMut};
use memchr::memmem;

const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// Splits an Annex-B byte stream into NAL units, each keeping its start code.
///
/// Returns `None` when `data` does not begin with a 3- or 4-byte start code.
pub fn split_annex_b(data: &Bytes) -> Option<Vec<Bytes>> {
    let starts: Vec<usize> = memmem::find_iter(data, &[0u8, 0, 1])
        .map(|pos| {
            if pos > 0 && data[pos - 1] == 0 {
                pos - 1
            } else {
                pos
            }
        })
        .collect();

    if starts.first() != Some(&0) {
        return None;
    }

    let units = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(data.len());
            data.slice(start..end)
        })
        .filter(|unit| unit.len() > 4)
        .collect();
    Some(units)
}

/// Extracts SPS and PPS NAL units from an `AVCDecoderConfigurationRecord`.
///
/// Each returned unit is prefixed with a 4-byte start code. Returns `None`
/// when the record is truncated or has an unknown version.
pub fn avc_config_nal_units(data: &[u8]) -> Option<Vec<Bytes>> {
    if data.len() < 7 || data[0] != 1 {
        return None;
    }

    let mut units = Vec::new();
    let mut pos = 5;

    let sps_count = (data[pos] & 0x1f) as usize;
    pos += 1;
    pos = read_parameter_sets(data, pos, sps_count, &mut units)?;

    let pps_count = *data.get(pos)? as usize;
    pos += 1;
    read_parameter_sets(data, pos, pps_count, &mut units)?;

    Some(units)
}

fn read_parameter_sets(
    data: &[u8],
    mut pos: usize,
    count: usize,
    out: &mut Vec<Bytes>,
) -> Option<usize> {
    for _ in 0..count {
        let len_bytes = data.get(pos..pos + 2)?;
        let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        pos += 2;
        let nal = data.get(pos..pos + len)?;
        pos += len;

        let mut unit = BytesMut::with_capacity(START_CODE.len() + len);
        unit.put_slice(&START_CODE);
        unit.put_slice(nal);
        out.push(unit.freeze());
    }
    Some(pos)
}
