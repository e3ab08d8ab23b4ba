use colored::Colorize;

pub fn cstr_to_string(ptr: *const libc::c_char) -> String {
    if ptr.is_null() {
        return "".to_string();
    }
    unsafe { std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned() }
}

/// Panics on a usage violation; the panic hook reports the message.
pub fn fatal(message: &str) -> ! {
    panic!("{}", message);
}

/// Reports a usage violation in red and aborts without unwinding.
pub fn abort(message: &str) -> ! {
    eprintln!("{}", format!("[edge-runtime] {}", message).red().bold());
    std::process::abort()
}
