use crate::types::{DeviceStatus, Event};

/// Events for every point in `current` that is new or whose value differs
/// from `previous`. Points that disappeared are not reported.
pub(crate) fn diff_status(
    device_id: &str,
    previous: &[DeviceStatus],
    current: &[DeviceStatus],
) -> Vec<Event> {
    current
        .iter()
        .filter(|point| {
            previous
                .iter()
                .find(|p| p.code == point.code)
                .is_none_or(|p| p.value != point.value)
        })
        .map(|point| Event::StatusChanged {
            device_id: device_id.to_string(),
            code: point.code.clone(),
            value: point.value.clone(),
        })
        .collect()
}
