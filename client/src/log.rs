use wasm_bindgen::JsValue;

pub fn info(message: &str) {
    web_sys::console::info_1(&JsValue::from_str(message));
}

pub fn warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}
