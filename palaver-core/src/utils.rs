/// Public STUN server used when no ICE configuration is supplied.
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
