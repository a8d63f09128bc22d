// ── Reactive device store ──
//
// `watch`-backed pool state with push-based change notification.

mod device_store;

pub use device_store::DeviceStore;
