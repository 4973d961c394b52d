use std::sync::Arc;
use std::time::Duration;

use dosvm_memory::{GuestMemory, GUEST_MEMORY_SIZE};
use dosvm_vga::{
    cga_palette, BufferConsole, MemoryDisplay, PaletteEntry, VgaConfig, VgaController, VgaError,
    WindowMapping, VGA_WINDOW_SIZE, VGA_WINDOW_START,
};

struct Rig {
    memory: GuestMemory,
    console: BufferConsole,
    display: MemoryDisplay,
    vga: Arc<VgaController>,
}

impl Drop for Rig {
    fn drop(&mut self) {
        self.vga.shutdown();
    }
}

fn rig(console: BufferConsole) -> Rig {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let memory = GuestMemory::new(GUEST_MEMORY_SIZE);
    let display = MemoryDisplay::new();
    // Redraw ticks are driven by hand through `poll`.
    let config = VgaConfig {
        graphics_refresh: Duration::from_secs(3600),
        text_refresh: Duration::from_secs(3600),
        ..VgaConfig::default()
    };
    let vga = VgaController::new(
        memory.clone(),
        config,
        Box::new(console.clone()),
        Box::new(display.clone()),
    );
    vga.init_alpha_mode();
    Rig {
        memory,
        console,
        display,
        vga,
    }
}

fn headless() -> Rig {
    rig(BufferConsole::detached())
}

#[test]
fn dac_triplet_commits_scaled_entry() {
    let rig = headless();
    rig.vga.port_write(0x3C8, 5).unwrap();
    rig.vga.port_write(0x3C9, 0x3F).unwrap();
    rig.vga.port_write(0x3C9, 0x00).unwrap();
    assert_ne!(rig.vga.palette_entry(5), PaletteEntry::new(0xFC, 0, 0));
    rig.vga.port_write(0x3C9, 0x00).unwrap();

    assert_eq!(rig.vga.palette_entry(5), PaletteEntry::new(0xFC, 0, 0));
    assert_eq!(rig.vga.port_read(0x3C8), 6);

    rig.vga.port_write(0x3C9, 0x01).unwrap();
    rig.vga.port_write(0x3C9, 0x02).unwrap();
    rig.vga.port_write(0x3C9, 0x03).unwrap();
    assert_eq!(rig.vga.palette_entry(6), PaletteEntry::new(0x04, 0x08, 0x0C));
}

#[test]
fn dac_read_back_returns_six_bit_components() {
    let rig = headless();
    rig.vga.set_palette(9, &[PaletteEntry::new(0xFC, 0x40, 0x00)]);
    rig.vga.port_write(0x3C7, 9).unwrap();
    let components: Vec<u8> = (0..3).map(|_| rig.vga.port_read(0x3C9)).collect();
    assert_eq!(components, vec![0x3F, 0x10, 0x00]);
}

#[test]
fn repeated_mode_set_keeps_framebuffer_and_surface() {
    let rig = headless();
    rig.vga.set_mode(0x13).unwrap();
    let first = rig.vga.geometry();
    rig.vga.set_mode(0x13).unwrap();
    let second = rig.vga.geometry();

    assert_eq!(first, second);
    assert_eq!((first.width, first.height, first.depth), (320, 200, 8));
    assert_eq!(first.framebuffer_len, 256 * 1024);
    assert_eq!(first.surface, Some((640, 480, 8)));
    assert_eq!(rig.display.screen().surfaces_created, 1);
    assert_eq!(rig.vga.window(), WindowMapping::Linear(0));
    assert!(rig.vga.is_timer_running());
}

#[test]
fn unknown_mode_is_rejected() {
    let rig = headless();
    assert!(matches!(rig.vga.set_mode(0x14), Err(VgaError::UnknownMode(0x14))));
    assert_eq!(rig.vga.current_mode(), 3);
}

#[test]
fn window_moves_are_lossless() {
    let rig = headless();
    rig.vga.set_mode(0x13).unwrap();
    let pattern: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    rig.memory.write_from(VGA_WINDOW_START, &pattern).unwrap();

    rig.vga.set_window_start(WindowMapping::Unchained);
    assert_eq!(rig.vga.framebuffer_bytes(0, pattern.len()), pattern);

    rig.memory.fill(VGA_WINDOW_START, pattern.len(), 0xEE).unwrap();
    rig.vga.set_window_start(WindowMapping::Linear(0));
    assert_eq!(
        rig.memory.read_vec(VGA_WINDOW_START, pattern.len()).unwrap(),
        pattern
    );
}

#[test]
fn window_moves_at_offset_are_lossless() {
    let rig = headless();
    rig.vga.set_mode(0x13).unwrap();
    let off = 0x1_0000;
    let pattern: Vec<u8> = (0..=255u8).cycle().take(VGA_WINDOW_SIZE).collect();

    rig.vga.set_window_start(WindowMapping::Linear(off));
    rig.memory.write_from(VGA_WINDOW_START, &pattern).unwrap();
    rig.vga.set_window_start(WindowMapping::Linear(0));
    assert_eq!(rig.vga.framebuffer_bytes(off, pattern.len()), pattern);
    assert_eq!(
        rig.memory.read_vec(VGA_WINDOW_START, 16).unwrap(),
        vec![0; 16]
    );

    rig.vga.set_window_start(WindowMapping::Linear(off));
    assert_eq!(
        rig.memory.read_vec(VGA_WINDOW_START, pattern.len()).unwrap(),
        pattern
    );
}

#[test]
fn window_past_framebuffer_end_copies_only_the_overlap() {
    let rig = headless();
    rig.vga.set_mode(0x13).unwrap();
    let fb_len = rig.vga.geometry().framebuffer_len;
    let half = VGA_WINDOW_SIZE / 2;
    rig.memory.fill(VGA_WINDOW_START, VGA_WINDOW_SIZE, 0x11).unwrap();

    // Half the window overlaps the framebuffer; the guest bytes past it stay as they were.
    rig.vga.set_window_start(WindowMapping::Linear(fb_len - half));
    let window = rig.memory.read_vec(VGA_WINDOW_START, VGA_WINDOW_SIZE).unwrap();
    assert!(window[..half].iter().all(|&b| b == 0));
    assert!(window[half..].iter().all(|&b| b == 0x11));

    rig.memory.fill(VGA_WINDOW_START, VGA_WINDOW_SIZE, 0x22).unwrap();
    rig.vga.set_window_start(WindowMapping::Linear(fb_len));
    assert_eq!(rig.vga.framebuffer_bytes(fb_len - half, half), vec![0x22; half]);
    assert_eq!(rig.vga.geometry().framebuffer_len, fb_len);
    // Nothing of a window entirely past the end is mirrored.
    assert_eq!(
        rig.memory.read_vec(VGA_WINDOW_START, VGA_WINDOW_SIZE).unwrap(),
        vec![0x22; VGA_WINDOW_SIZE]
    );

    rig.memory.fill(VGA_WINDOW_START, VGA_WINDOW_SIZE, 0x33).unwrap();
    rig.vga.set_window_start(WindowMapping::Linear(fb_len - half));
    assert_eq!(rig.vga.framebuffer_bytes(fb_len - half, half), vec![0x22; half]);
}

#[test]
fn mode_set_clears_the_previous_picture() {
    let rig = headless();
    rig.vga.set_mode(0x13).unwrap();
    rig.memory.fill(VGA_WINDOW_START, 16, 0xAA).unwrap();
    rig.vga.poll();
    assert_eq!(rig.vga.framebuffer_bytes(0, 16), vec![0xAA; 16]);

    rig.vga.set_mode(0x13).unwrap();
    assert_eq!(rig.memory.read_vec(VGA_WINDOW_START, 16).unwrap(), vec![0; 16]);
    rig.vga.poll();
    assert_eq!(rig.vga.framebuffer_bytes(0, 16), vec![0; 16]);

    rig.memory.fill(VGA_WINDOW_START, 16, 0xAA).unwrap();
    rig.vga.poll();
    rig.vga.set_mode(3).unwrap();
    rig.vga.set_mode(0x13).unwrap();
    assert_eq!(rig.memory.read_vec(VGA_WINDOW_START, 16).unwrap(), vec![0; 16]);
}

#[test]
fn mode_set_without_clear_keeps_video_memory() {
    let rig = headless();
    rig.vga.set_mode(0x13).unwrap();
    rig.memory.fill(VGA_WINDOW_START, 16, 0xAA).unwrap();

    rig.vga.set_mode_with(0x13, false).unwrap();
    assert_eq!(rig.memory.read_vec(VGA_WINDOW_START, 16).unwrap(), vec![0xAA; 16]);
    rig.vga.poll();
    assert_eq!(rig.vga.framebuffer_bytes(0, 16), vec![0xAA; 16]);
}

#[test]
fn sequencer_memory_mode_switches_chain4() {
    let rig = headless();
    rig.vga.set_mode(0x13).unwrap();
    rig.vga.port_write(0x3C4, 0x04).unwrap();
    assert_eq!(rig.vga.port_read(0x3C5), 0xFF);

    rig.vga.port_write(0x3C5, 0x06).unwrap();
    assert_eq!(rig.vga.window(), WindowMapping::Unchained);
    assert_eq!(rig.vga.port_read(0x3C5), 0xF7);

    rig.vga.port_write(0x3C5, 0x0E).unwrap();
    assert_eq!(rig.vga.window(), WindowMapping::Linear(0));
    assert_eq!(rig.vga.port_read(0x3C5), 0xFF);
}

#[test]
fn retrace_toggles_per_read_without_timer() {
    let rig = headless();
    assert!(!rig.vga.is_timer_running());
    let reads: Vec<u8> = (0..4).map(|_| rig.vga.port_read(0x3DA)).collect();
    assert_eq!(reads, vec![0x00, 0x0B, 0x00, 0x0B]);
}

#[test]
fn retrace_pulses_once_per_frame_with_timer() {
    let rig = headless();
    rig.vga.set_mode(0x13).unwrap();
    assert!(rig.vga.is_timer_running());

    let reads: Vec<u8> = (0..3).map(|_| rig.vga.port_read(0x3DA)).collect();
    assert_eq!(reads, vec![0x00, 0x03, 0x00]);

    rig.vga.poll();
    assert_eq!(rig.vga.port_read(0x3DA), 0x0B);
    assert_eq!(rig.vga.port_read(0x3BA), 0x00);
}

#[test]
fn status_read_resets_attribute_flip_flop() {
    let rig = headless();
    rig.vga.port_write(0x3C0, 0x01).unwrap();
    // Without the reset this write would be taken as an index.
    rig.vga.port_read(0x3DA);
    rig.vga.port_write(0x3C0, 0x02).unwrap();
    rig.vga.port_write(0x3C0, 0x3F).unwrap();
    assert_eq!(rig.vga.color16(2), 0x3F);
    assert_eq!(rig.vga.port_read(0x3C1), 0x3F);
    assert_eq!(rig.vga.palette_entry(2), PaletteEntry::new(0xFF, 0xFF, 0xFF));
}

#[test]
fn cga_color_control_switches_palettes() {
    let rig = headless();
    rig.vga.set_mode(4).unwrap();
    assert_eq!(rig.vga.palette_size(), 4);
    assert_eq!(rig.vga.palette_entry(1), cga_palette(1, false)[1]);

    rig.vga.port_write(0x3D9, 0x10).unwrap();
    for i in 0..4u8 {
        assert_eq!(rig.vga.palette_entry(i), cga_palette(0, true)[usize::from(i)]);
    }
    assert_eq!(rig.display.screen().palette[2], cga_palette(0, true)[2]);

    rig.vga.port_write(0x3D9, 0x20).unwrap();
    assert_eq!(rig.vga.palette_entry(3), cga_palette(1, false)[3]);
}

#[test]
fn mode_control_register_selects_cga_modes() {
    let rig = headless();
    rig.vga.port_write(0x3D8, 0x0A).unwrap();
    assert_eq!(rig.vga.current_mode(), 4);
    assert_eq!(rig.vga.geometry().depth, 2);

    rig.vga.port_write(0x3D8, 0x1A).unwrap();
    assert_eq!(rig.vga.current_mode(), 6);
    let geometry = rig.vga.geometry();
    assert_eq!((geometry.width, geometry.height, geometry.depth), (160, 200, 4));

    rig.vga.port_write(0x3D8, 0x1E).unwrap();
    assert_eq!(rig.vga.current_mode(), 6);
    let geometry = rig.vga.geometry();
    assert_eq!((geometry.width, geometry.depth), (640, 1));

    rig.vga.port_write(0x3D8, 0x09).unwrap();
    assert_eq!(rig.vga.current_mode(), 3);
    assert_eq!(rig.vga.geometry().surface, None);

    // Unrecognized combinations leave the mode alone.
    rig.vga.port_write(0x3D8, 0x13).unwrap();
    assert_eq!(rig.vga.current_mode(), 3);
}

#[test]
fn graphics_poll_doubles_mode_13_pixels() {
    let rig = headless();
    rig.vga.set_mode(0x13).unwrap();
    rig.memory.write_u8(VGA_WINDOW_START, 7);
    rig.memory.write_u8(VGA_WINDOW_START + 1, 9);
    rig.vga.poll();

    let screen = rig.display.screen();
    let pitch = screen.pitch;
    assert_eq!(screen.frames, 1);
    assert_eq!(&screen.pixels[0..4], &[7, 7, 9, 9]);
    assert_eq!(&screen.pixels[pitch..pitch + 4], &[7, 7, 9, 9]);
}

#[test]
fn failed_surface_lock_skips_the_frame() {
    let rig = headless();
    rig.vga.set_mode(0x13).unwrap();
    rig.display.set_fail_locks(true);
    rig.vga.poll();
    assert_eq!(rig.display.screen().frames, 0);
    // The retrace pulse still happens.
    assert_eq!(rig.vga.port_read(0x3DA) & 0x08, 0x08);

    rig.display.set_fail_locks(false);
    rig.vga.poll();
    assert_eq!(rig.display.screen().frames, 1);
}

#[test]
fn text_redraw_only_writes_changed_rows() {
    let rig = rig(BufferConsole::new(80, 25));
    rig.vga.poll();
    assert_eq!(rig.console.screen().rows_written, 25);

    rig.vga.poll();
    assert_eq!(rig.console.screen().rows_written, 25);

    rig.vga.put_char(b'H');
    rig.vga.put_char(b'I');
    rig.vga.poll();

    let screen = rig.console.screen();
    assert_eq!(screen.rows_written, 26);
    assert!(screen.row_text(0).starts_with("HI "));
    assert_eq!(screen.cursor, (2, 0));
}

#[test]
fn text_mode_with_console_runs_redraw_timer() {
    let rig = rig(BufferConsole::new(80, 25));
    rig.vga.set_mode(1).unwrap();
    assert!(rig.vga.is_timer_running());
    assert_eq!(rig.vga.text_size(), (40, 25));
    assert_eq!(rig.console.screen().cols, 40);

    rig.vga.shutdown();
    assert!(!rig.vga.is_timer_running());
}

#[test]
fn teletype_scrolls_at_bottom_of_screen() {
    let rig = headless();
    rig.vga.set_cursor_position(0, 24);
    rig.vga.put_char(b'Z');
    rig.vga.put_char(b'\r');
    rig.vga.put_char(b'\n');

    assert_eq!(rig.vga.cursor_position(), (0, 24));
    let row_23 = 0xB_8000 + 23 * 160;
    assert_eq!(rig.memory.read_u8(row_23), b'Z');
    assert_eq!(rig.memory.read_u8(0xB_8000 + 24 * 160), b' ');
    // Without a console, output is mirrored as raw bytes.
    assert_eq!(rig.console.screen().raw, b"Z\r\n");
}

#[test]
fn scroll_down_exposes_blank_lines() {
    let rig = headless();
    rig.vga.write_chars(0, 0, b'A', Some(0x1E), 3);
    rig.vga.scroll_down(0, 0, 24, 79, 2, 0x07);

    assert_eq!(rig.memory.read_u8(0xB_8000), b' ');
    assert_eq!(rig.memory.read_u8(0xB_8001), 0x07);
    rig.vga.set_cursor_position(2, 2);
    assert_eq!(rig.vga.char_at_cursor(), (b'A', 0x1E));
}
