use deck_export::*;
use deck_model::{Card, CardImage, Deck, SizeClass};
use image::{Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

fn deck_of(count: usize) -> Deck {
    let mut buf = Vec::new();
    RgbaImage::from_pixel(16, 22, Rgba([40, 80, 120, 255]))
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    let mut deck = Deck::default();
    for _ in 0..count {
        deck.add_card(Card::new(CardImage::new(buf.clone()), SizeClass::Standard).unwrap())
            .unwrap();
    }
    deck
}

fn small_spec() -> SheetSpec {
    SheetSpec {
        dpi: 36,
        ..SheetSpec::default()
    }
}

#[test]
fn test_cancelled_job_returns_no_output() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let monitor = JobMonitor::new(cancel, None);
    let job = ExportJob::Pdf { spec: small_spec() };
    assert!(matches!(
        run_job(&deck_of(2), &job, &monitor),
        Err(ExportError::Cancelled)
    ));
}

#[test]
fn test_cancel_between_pages() {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    // Cancel as soon as the second page is reached
    let progress: ProgressFn = Arc::new(move |p: ExportProgress| {
        if p.current >= 1 {
            flag.cancel();
        }
    });
    let monitor = JobMonitor::new(cancel, Some(progress));
    let job = ExportJob::Pdf { spec: small_spec() };
    // 9 cards per A4 sheet, so 20 cards need three sheets
    let result = run_job(&deck_of(20), &job, &monitor);
    assert!(matches!(result, Err(ExportError::Cancelled)));
}

#[test]
fn test_progress_reported_per_page() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let progress: ProgressFn = Arc::new(move |p: ExportProgress| {
        sink.lock().unwrap().push((p.current, p.total));
    });
    let monitor = JobMonitor::new(CancelFlag::new(), Some(progress));
    let job = ExportJob::Pdf { spec: small_spec() };
    let output = run_job(&deck_of(10), &job, &monitor).unwrap();
    assert!(matches!(output, ExportOutput::Pdf(ref bytes) if bytes.starts_with(b"%PDF")));
    assert_eq!(*seen.lock().unwrap(), vec![(0, 2), (1, 2), (2, 2)]);
}

#[test]
fn test_octgn_job_checks_between_cards() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let job = ExportJob::Octgn {
        options: OctgnOptions::default(),
    };
    let result = run_job(&deck_of(1), &job, &JobMonitor::new(cancel, None));
    assert!(matches!(result, Err(ExportError::Cancelled)));
}

#[tokio::test]
async fn test_run_export_uses_snapshot() {
    let deck = Arc::new(deck_of(3));
    let job = ExportJob::Tabletop {
        options: TabletopOptions {
            card_width_px: 32,
            format: ImageFormat::Png,
        },
    };
    match run_export(Arc::clone(&deck), job, JobMonitor::default()).await {
        Ok(ExportOutput::Tabletop(sheets)) => {
            assert_eq!(sheets.card_count, 3);
            assert_eq!((sheets.columns, sheets.rows), (3, 1));
        }
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_job_names() {
    assert_eq!(
        ExportJob::Pdf {
            spec: SheetSpec::default()
        }
        .name(),
        "PDF export"
    );
}
