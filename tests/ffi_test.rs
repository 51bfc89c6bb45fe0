//! C ABI tests

mod common;

use common::{minimal_pdf, minimal_pdf_file};
use pdf_guard::ffi::*;
use pdf_guard::ErrorKind;
use std::ffi::{c_char, CStr, CString};
use std::ptr;

fn last_message(ctx: *mut MpContext) -> String {
    let mut buf = [0 as c_char; 256];
    let n = unsafe { mp_last_error_message(ctx, buf.as_mut_ptr(), buf.len()) };
    assert!(n >= 0);
    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

#[test]
fn test_null_context_everywhere() {
    let ctx = ptr::null_mut();
    let path = CString::new("/tmp/whatever.pdf").unwrap();
    unsafe {
        assert_eq!(mp_open_document(ctx, path.as_ptr()), 0);
        assert_eq!(mp_open_memory(ctx, ptr::null(), 0), 0);
        assert_eq!(mp_load_outline(ctx, 1), 0);
        assert_eq!(mp_load_links(ctx, 1), 0);
        assert_eq!(
            mp_page_number_from_location(ctx, 1, MpLocation { chapter: 0, page: 0 }),
            -1
        );
        let identity = MpMatrix {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        };
        assert_eq!(mp_new_pixmap_from_page(ctx, 1, identity, 3, 0), 0);
        assert_eq!(mp_new_stext_page_from_page(ctx, 1, ptr::null()), 0);
        assert_eq!(mp_lookup_metadata(ctx, 1, ptr::null(), ptr::null_mut(), 0), -1);
        mp_drop_page(ctx, 1);
        mp_drop_stream(ctx, 1);
        mp_drop_context(ctx);
    }
}

#[test]
fn test_end_to_end_over_c_abi() {
    let ctx = mp_new_context();
    if ctx.is_null() {
        eprintln!("skipping C ABI test: PDFium not available");
        return;
    }

    let file = minimal_pdf_file();
    let path = CString::new(file.path().to_str().unwrap()).unwrap();

    unsafe {
        assert_eq!(mp_last_error_code(ctx), 0);
        assert_eq!(last_message(ctx), "");

        let doc = mp_open_document(ctx, path.as_ptr());
        assert_ne!(doc, 0, "{}", last_message(ctx));
        assert_eq!(mp_count_pages(ctx, doc), 2);

        let page = mp_load_page(ctx, doc, 1);
        assert_ne!(page, 0);
        let bounds = mp_bound_page(ctx, page);
        assert_eq!((bounds.x1, bounds.y1), (300.0, 400.0));
        let content = mp_bound_content(ctx, page);
        assert!(content.x0 > content.x1, "blank page has no content");

        let scale = MpMatrix {
            a: 2.0,
            b: 0.0,
            c: 0.0,
            d: 2.0,
            e: 0.0,
            f: 0.0,
        };
        let pix = mp_new_pixmap_from_page(ctx, page, scale, 1, 0);
        assert_ne!(pix, 0, "{}", last_message(ctx));
        assert_eq!(mp_pixmap_width(ctx, pix), 600);
        assert_eq!(mp_pixmap_height(ctx, pix), 800);
        let mut len = 0usize;
        let samples = mp_pixmap_samples(ctx, pix, &mut len);
        assert!(!samples.is_null());
        assert_eq!(len, 600 * 800);

        // Colorspace with 2 components does not exist
        assert_eq!(mp_new_pixmap_from_page(ctx, page, scale, 2, 0), 0);
        assert_eq!(mp_last_error_code(ctx), ErrorKind::Argument.code());

        let key = CString::new("info:Title").unwrap();
        let mut buf = [0 as c_char; 4];
        let n = mp_lookup_metadata(ctx, doc, key.as_ptr(), buf.as_mut_ptr(), buf.len());
        assert_eq!(n, 7);
        assert_eq!(CStr::from_ptr(buf.as_ptr()).to_str().unwrap(), "Fix");

        let options = MpTextOptions { flags: 0 };
        let first = mp_load_page(ctx, doc, 0);
        assert_ne!(mp_new_stext_page_from_page(ctx, first, &options), 0);

        assert_eq!(mp_load_page(ctx, doc, 5), 0);
        assert_eq!(mp_last_error_code(ctx), ErrorKind::Range.code());
        assert!(last_message(ctx).contains("out of bounds"));

        mp_drop_pixmap(ctx, pix);
        assert_eq!(mp_pixmap_width(ctx, pix), -1);
        // Releasing twice or releasing an unknown handle is harmless
        mp_drop_pixmap(ctx, pix);
        mp_drop_links(ctx, 12345);
        mp_drop_outline(ctx, 0);
        mp_drop_document(ctx, doc);
        assert_eq!(mp_count_pages(ctx, doc), -1);

        let data = minimal_pdf();
        let stream = mp_open_memory(ctx, data.as_ptr(), data.len());
        let magic = CString::new("pdf").unwrap();
        let doc = mp_open_document_with_stream(ctx, magic.as_ptr(), stream);
        assert_ne!(doc, 0, "{}", last_message(ctx));
        assert_eq!(mp_count_pages(ctx, doc), 2);

        assert_eq!(mp_open_document(ctx, ptr::null()), 0);
        assert_eq!(mp_last_error_code(ctx), ErrorKind::Argument.code());
        assert_eq!(last_message(ctx), "Invalid argument: filename is null");

        mp_drop_context(ctx);
    }
}
