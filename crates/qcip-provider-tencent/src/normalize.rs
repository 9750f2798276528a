//! Blank-to-absent normalization
//!
//! Tencent Cloud rejects some write requests whose optional string fields
//! are present but empty, even though the matching read call returns them
//! that way. Before a payload is sent, every `Some("")` in it is turned
//! into `None`, recursing into nested structs and lists.

/// Clear empty optional strings in place
pub(crate) trait BlankToAbsent {
    fn blank_to_absent(&mut self);
}

impl BlankToAbsent for Option<String> {
    fn blank_to_absent(&mut self) {
        if self.as_deref() == Some("") {
            *self = None;
        }
    }
}

impl<T: BlankToAbsent> BlankToAbsent for Vec<T> {
    fn blank_to_absent(&mut self) {
        for item in self.iter_mut() {
            item.blank_to_absent();
        }
    }
}
