use deck_export::layout::*;
use deck_export::render::*;
use deck_export::*;
use deck_model::{Card, CardImage, Deck, Sidedness, SizeClass};
use image::{Rgba, RgbaImage};
use std::io::Cursor;

const RED: [u8; 4] = [220, 20, 20, 255];
const GREEN: [u8; 4] = [20, 200, 20, 255];
const BLUE: [u8; 4] = [20, 20, 220, 255];

fn png(image: &RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn solid_png(color: [u8; 4]) -> Vec<u8> {
    png(&RgbaImage::from_pixel(64, 89, Rgba(color)))
}

/// Top half `top`, bottom half `bottom`
fn two_tone_png(top: [u8; 4], bottom: [u8; 4]) -> Vec<u8> {
    png(&RgbaImage::from_fn(64, 90, |_, y| {
        if y < 45 { Rgba(top) } else { Rgba(bottom) }
    }))
}

fn low_res_spec() -> SheetSpec {
    SheetSpec {
        dpi: 72,
        ..SheetSpec::default()
    }
}

fn dominant(pixel: &Rgba<u8>, color: [u8; 4]) -> bool {
    pixel
        .0
        .iter()
        .zip(color.iter())
        .all(|(a, b)| (*a as i16 - *b as i16).abs() <= 8)
}

fn pixel_at(page: &ComposedPage, spec: &SheetSpec, x_mm: f32, y_mm: f32) -> Rgba<u8> {
    let ppm = spec.px_per_mm();
    *page
        .image
        .get_pixel((x_mm * ppm) as u32, (y_mm * ppm) as u32)
}

#[test]
fn test_two_sided_pages_show_fronts_and_backs() {
    let mut deck = Deck::default();
    deck.add_card(Card::new(CardImage::new(solid_png(RED)), SizeClass::Standard).unwrap())
        .unwrap();
    deck.set_shared_back(Some(CardImage::new(solid_png(BLUE))))
        .unwrap();
    deck.set_sidedness(Sidedness::SingleBackShared).unwrap();

    let spec = low_res_spec();
    let pages = compose_deck(&deck, &spec, &RasterCodec::default()).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].side, SheetSide::Front);
    assert_eq!(pages[1].side, SheetSide::Back);
    assert_eq!(pages[0].image.dimensions(), spec.page_size_px());

    let layout = layout(&deck, &spec).unwrap();
    let front = layout[0].front.placements[0].trim_rect;
    let back = layout[0].back.as_ref().unwrap().placements[0].trim_rect;

    let p = pixel_at(&pages[0], &spec, front.center_x(), front.center_y());
    assert!(dominant(&p, RED), "front pixel {:?}", p);
    let p = pixel_at(&pages[1], &spec, back.center_x(), back.center_y());
    assert!(dominant(&p, BLUE), "back pixel {:?}", p);
    // Page corner stays white
    assert_eq!(pages[0].image.get_pixel(1, 1), &Rgba([255, 255, 255, 255]));
}

#[test]
fn test_fold_glue_back_drawn_upside_down() {
    let card = Card::new(CardImage::new(solid_png(RED)), SizeClass::Standard)
        .unwrap()
        .with_back(Some(CardImage::new(two_tone_png(GREEN, BLUE))));
    let mut deck = Deck::default();
    deck.add_card(card).unwrap();

    let spec = SheetSpec {
        mode: LayoutMode::FoldGlue,
        ..low_res_spec()
    };
    let pages = compose_deck(&deck, &spec, &RasterCodec::default()).unwrap();
    assert_eq!(pages.len(), 1);

    let layout = layout(&deck, &spec).unwrap();
    let back = layout[0].front.placements[1].trim_rect;
    assert_eq!(layout[0].front.placements[1].rotation, Rotation::Half);

    // Rotated half a turn, the bottom colour ends up on top
    let upper = pixel_at(&pages[0], &spec, back.center_x(), back.y + back.height * 0.25);
    let lower = pixel_at(&pages[0], &spec, back.center_x(), back.y + back.height * 0.75);
    assert!(dominant(&upper, BLUE), "upper {:?}", upper);
    assert!(dominant(&lower, GREEN), "lower {:?}", lower);
}

#[test]
fn test_blank_back_leaves_page_white() {
    let mut deck = Deck::default();
    deck.add_card(Card::new(CardImage::new(solid_png(RED)), SizeClass::Standard).unwrap())
        .unwrap();
    let spec = low_res_spec();
    let pages = compose_deck(&deck, &spec, &RasterCodec::default()).unwrap();
    let white = Rgba([255, 255, 255, 255]);
    assert!(pages[1].image.pixels().all(|p| *p == white));
}

#[test]
fn test_crop_marks_drawn_outside_cards() {
    let mut deck = Deck::default();
    deck.add_card(Card::new(CardImage::new(solid_png(RED)), SizeClass::Standard).unwrap())
        .unwrap();
    let spec = SheetSpec {
        marks: PrinterMarks {
            crop_marks: true,
            fold_line: false,
        },
        ..low_res_spec()
    };
    let pages = compose_deck(&deck, &spec, &RasterCodec::default()).unwrap();
    let layout = layout(&deck, &spec).unwrap();
    let trim = layout[0].front.placements[0].trim_rect;

    // Mark above the top-left corner, on the left trim line
    let p = pixel_at(&pages[0], &spec, trim.x, trim.y - 3.0);
    assert_ne!(p, Rgba([255, 255, 255, 255]));
}

#[test]
fn test_decode_failure_names_card() {
    let card = Card::new(CardImage::new(vec![1u8, 2, 3, 4]), SizeClass::Standard)
        .unwrap()
        .with_metadata(deck_model::CardMetadata {
            name: Some("Broken".into()),
            ..Default::default()
        });
    let mut deck = Deck::default();
    deck.add_card(card).unwrap();

    match compose_deck(&deck, &low_res_spec(), &RasterCodec::default()) {
        Err(ExportError::Collaborator { context, .. }) => {
            assert!(context.contains("card 1"), "{}", context);
            assert!(context.contains("Broken"), "{}", context);
        }
        other => panic!("expected collaborator error, got {:?}", other.map(|p| p.len())),
    }
}
