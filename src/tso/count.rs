/// 预估一个包会被切成多少段，用于事先准备描述符池。
///
/// 不做映射，也不关心片段容量；`mss == 0` 时返回 0。
pub fn count_segments(total_len: usize, header_len: usize, mss: u32) -> u32 {
    let payload = total_len.saturating_sub(header_len);
    if payload == 0 || mss == 0 {
        return 0;
    }
    payload.div_ceil(mss as usize) as u32
}
