//! Un-minimizing the game window and clipping shaped windows
//!
//! Only Windows lets us restore another process's window. Elsewhere a
//! minimized game stays minimized and the caller skips the frame.

use image::RgbaImage;

#[cfg(target_os = "windows")]
mod win32 {
    use std::ffi::c_void;

    pub type HWND = *mut c_void;
    pub type HRGN = *mut c_void;
    pub type BOOL = i32;

    #[repr(C)]
    #[derive(Default)]
    pub struct POINT {
        pub x: i32,
        pub y: i32,
    }

    pub const SW_RESTORE: i32 = 9;
    pub const HWND_BOTTOM: HWND = 1 as HWND;
    pub const SWP_NOSIZE: u32 = 0x0001;
    pub const SWP_NOMOVE: u32 = 0x0002;
    pub const SWP_SHOWWINDOW: u32 = 0x0040;
    pub const REGION_ERROR: i32 = 0;
    pub const NULLREGION: i32 = 1;

    #[link(name = "user32")]
    unsafe extern "system" {
        pub fn IsIconic(hwnd: HWND) -> BOOL;
        pub fn ShowWindow(hwnd: HWND, cmd_show: i32) -> BOOL;
        pub fn SetWindowPos(
            hwnd: HWND,
            insert_after: HWND,
            x: i32,
            y: i32,
            cx: i32,
            cy: i32,
            flags: u32,
        ) -> BOOL;
        pub fn GetCursorPos(point: *mut POINT) -> BOOL;
        pub fn SetCursorPos(x: i32, y: i32) -> BOOL;
        pub fn GetWindowRgn(hwnd: HWND, hrgn: HRGN) -> i32;
    }

    #[link(name = "gdi32")]
    unsafe extern "system" {
        pub fn CreateRectRgn(left: i32, top: i32, right: i32, bottom: i32) -> HRGN;
        pub fn PtInRegion(hrgn: HRGN, x: i32, y: i32) -> BOOL;
        pub fn DeleteObject(object: *mut c_void) -> BOOL;
    }

    pub fn hwnd(window_id: u32) -> HWND {
        window_id as usize as HWND
    }
}

/// Restore a minimized window behind the others, leaving the pointer where
/// it was. Returns false when the platform cannot do this.
#[cfg(target_os = "windows")]
pub fn restore_window(window_id: u32) -> bool {
    use win32::*;

    let hwnd = hwnd(window_id);
    unsafe {
        if IsIconic(hwnd) == 0 {
            return true;
        }
        ShowWindow(hwnd, SW_RESTORE);

        let mut cursor = POINT::default();
        if GetCursorPos(&mut cursor) != 0 {
            SetWindowPos(
                hwnd,
                HWND_BOTTOM,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_SHOWWINDOW,
            );
            SetCursorPos(cursor.x, cursor.y);
        }
        IsIconic(hwnd) == 0
    }
}

#[cfg(not(target_os = "windows"))]
pub fn restore_window(_window_id: u32) -> bool {
    false
}

/// Make pixels outside a shaped window's region transparent.
#[cfg(target_os = "windows")]
pub fn clip_to_window_region(window_id: u32, image: &mut RgbaImage) {
    use win32::*;

    unsafe {
        let region = CreateRectRgn(0, 0, 0, 0);
        if region.is_null() {
            return;
        }
        let kind = GetWindowRgn(hwnd(window_id), region);
        if kind != REGION_ERROR && kind != NULLREGION {
            clear_outside(image, |x, y| PtInRegion(region, x as i32, y as i32) != 0);
        }
        DeleteObject(region);
    }
}

#[cfg(not(target_os = "windows"))]
pub fn clip_to_window_region(_window_id: u32, _image: &mut RgbaImage) {}

/// Zero every pixel for which `inside` is false.
pub fn clear_outside(image: &mut RgbaImage, inside: impl Fn(u32, u32) -> bool) {
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if !inside(x, y) {
            pixel.0 = [0, 0, 0, 0];
        }
    }
}
