// Byte / codepoint dumps of streamed text, compiled in with `utf8-trace`.
#[cfg(feature = "utf8-trace")]
pub fn dump_str(label: &str, s: &str) {
    use std::fmt::Write;
    let mut hex = String::with_capacity(s.len() * 3);
    for b in s.as_bytes() {
        let _ = write!(&mut hex, "{:02X} ", b);
    }
    let mut cps = String::new();
    for ch in s.chars() {
        let _ = write!(&mut cps, "U+{:04X} ", ch as u32);
    }
    tracing::trace!("🔎 [{label}] bytes: {hex}");
    tracing::trace!("🔎 [{label}] cps  : {cps}");
}
#[cfg(not(feature = "utf8-trace"))]
#[inline]
pub fn dump_str(_label: &str, _s: &str) {}
