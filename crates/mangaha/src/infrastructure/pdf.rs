use std::io::Write;

use flate2::{Compression, write::ZlibEncoder};
use image::ImageFormat;
use lopdf::{
    Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("cannot decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("malformed jpeg header")]
    MalformedJpeg,
    #[error("cannot write pdf: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Frame parameters of a jpeg, read from its markers without decoding.
#[derive(Debug, PartialEq, Eq)]
struct JpegHeader {
    width: u32,
    height: u32,
    components: u8,
    /// An Adobe APP14 segment was seen. Adobe writes CMYK inverted.
    adobe: bool,
}

fn read_jpeg_header(bytes: &[u8]) -> Option<JpegHeader> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut adobe = false;
    let mut pos = 2;
    loop {
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        pos += 1;
        while *bytes.get(pos)? == 0xFF {
            pos += 1;
        }
        let marker = bytes[pos];
        pos += 1;

        match marker {
            0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => return None,
            _ => {}
        }

        let len = u16::from_be_bytes([*bytes.get(pos)?, *bytes.get(pos + 1)?]) as usize;
        if len < 2 {
            return None;
        }
        let segment = bytes.get(pos + 2..pos + len)?;

        match marker {
            0xEE if segment.starts_with(b"Adobe") => adobe = true,
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                if segment.len() < 6 {
                    return None;
                }
                return Some(JpegHeader {
                    height: u16::from_be_bytes([segment[1], segment[2]]) as u32,
                    width: u16::from_be_bytes([segment[3], segment[4]]) as u32,
                    components: segment[5],
                    adobe,
                });
            }
            _ => {}
        }

        pos += len;
    }
}

/// Raster data ready to be embedded as an image XObject.
struct PageImage {
    width: u32,
    height: u32,
    color_space: &'static str,
    filter: &'static str,
    decode: Option<Vec<Object>>,
    data: Vec<u8>,
}

impl PageImage {
    /// Jpeg is passed through untouched, anything else is decoded to RGB and
    /// deflated.
    fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        if image::guess_format(bytes)? == ImageFormat::Jpeg {
            let header = read_jpeg_header(bytes).ok_or(PdfError::MalformedJpeg)?;
            let (color_space, decode) = match header.components {
                1 => ("DeviceGray", None),
                3 => ("DeviceRGB", None),
                4 if header.adobe => (
                    "DeviceCMYK",
                    Some([1, 0, 1, 0, 1, 0, 1, 0].map(Object::Integer).to_vec()),
                ),
                4 => ("DeviceCMYK", None),
                _ => return Err(PdfError::MalformedJpeg),
            };

            return Ok(Self {
                width: header.width,
                height: header.height,
                color_space,
                filter: "DCTDecode",
                decode,
                data: bytes.to_vec(),
            });
        }

        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(rgb.as_raw())?;

        Ok(Self {
            width,
            height,
            color_space: "DeviceRGB",
            filter: "FlateDecode",
            decode: None,
            data: encoder.finish()?,
        })
    }

    fn into_stream(self) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(self.width as i64),
            "Height" => Object::Integer(self.height as i64),
            "ColorSpace" => self.color_space,
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => self.filter,
        };
        if let Some(decode) = self.decode {
            dict.set("Decode", decode);
        }

        Stream::new(dict, self.data).with_compression(false)
    }
}

fn add_page(doc: &mut Document, pages_id: ObjectId, image: PageImage) -> Result<ObjectId, PdfError> {
    let (width, height) = (image.width as i64, image.height as i64);
    let image_id = doc.add_object(image.into_stream());

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(height),
        ],
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
        "Contents" => content_id,
    });

    Ok(page_id)
}

/// Build a pdf with one page per image, each page sized to its image.
///
/// No image gives an empty byte vector rather than an empty document.
pub fn assemble_pdf<B: AsRef<[u8]>>(images: &[B]) -> Result<Vec<u8>, PdfError> {
    if images.is_empty() {
        return Ok(vec![]);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(images.len());
    for bytes in images {
        let image = PageImage::from_bytes(bytes.as_ref())?;
        kids.push(Object::Reference(add_page(&mut doc, pages_id, image)?));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;

    Ok(buf)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;
    use image::{DynamicImage, RgbImage};

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_empty_input() {
        let pdf = assemble_pdf::<Vec<u8>>(&[]).unwrap();
        assert!(pdf.is_empty());
    }

    #[test]
    fn test_single_png_page() {
        let pdf = assemble_pdf(&[encode(4, 6, ImageFormat::Png)]).unwrap();

        assert!(pdf.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_pages_follow_input_order() {
        let pdf = assemble_pdf(&[
            encode(4, 6, ImageFormat::Jpeg),
            encode(8, 3, ImageFormat::Png),
        ])
        .unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);

        let first = doc.get_dictionary(pages[&1]).unwrap();
        let media_box = first.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_i64().unwrap(), 4);
        assert_eq!(media_box[3].as_i64().unwrap(), 6);
    }

    /// Markers of a 4-component Adobe jpeg, enough for the header reader.
    fn cmyk_jpeg_header(width: u16, height: u16) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend([0xFF, 0xEE, 0x00, 0x0E]);
        bytes.extend(b"Adobe");
        bytes.extend([0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x02]);
        bytes.extend([0xFF, 0xC0, 0x00, 0x14, 0x08]);
        bytes.extend(height.to_be_bytes());
        bytes.extend(width.to_be_bytes());
        bytes.push(4);
        for id in 1..=4 {
            bytes.extend([id, 0x11, 0x00]);
        }
        bytes.extend([0xFF, 0xD9]);
        bytes
    }

    fn image_dict(pdf: &[u8]) -> lopdf::Dictionary {
        let doc = Document::load_mem(pdf).unwrap();
        let page = doc.get_dictionary(doc.get_pages()[&1]).unwrap();
        let image_id = page
            .get(b"Resources")
            .and_then(Object::as_dict)
            .and_then(|resources| resources.get(b"XObject"))
            .and_then(Object::as_dict)
            .and_then(|xobjects| xobjects.get(b"Im0"))
            .and_then(Object::as_reference)
            .unwrap();

        doc.get_object(image_id)
            .and_then(Object::as_stream)
            .unwrap()
            .dict
            .clone()
    }

    #[test]
    fn test_read_jpeg_header() {
        assert_eq!(
            read_jpeg_header(&encode(4, 6, ImageFormat::Jpeg)),
            Some(JpegHeader {
                width: 4,
                height: 6,
                components: 3,
                adobe: false,
            })
        );
        assert_eq!(
            read_jpeg_header(&cmyk_jpeg_header(5, 7)),
            Some(JpegHeader {
                width: 5,
                height: 7,
                components: 4,
                adobe: true,
            })
        );
        assert_eq!(read_jpeg_header(&[0xFF, 0xD8, 0xFF, 0xD9]), None);
    }

    #[test]
    fn test_rgb_jpeg_is_device_rgb() {
        let dict = image_dict(&assemble_pdf(&[encode(4, 6, ImageFormat::Jpeg)]).unwrap());

        assert_eq!(dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
        assert_eq!(dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert!(dict.get(b"Decode").is_err());
    }

    #[test]
    fn test_cmyk_jpeg_is_device_cmyk() {
        let jpeg = cmyk_jpeg_header(5, 7);
        let dict = image_dict(&assemble_pdf(&[jpeg]).unwrap());

        assert_eq!(dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceCMYK");
        assert_eq!(dict.get(b"Width").unwrap().as_i64().unwrap(), 5);
        assert_eq!(dict.get(b"Height").unwrap().as_i64().unwrap(), 7);
        assert_eq!(dict.get(b"Decode").unwrap().as_array().unwrap().len(), 8);
    }

    #[test]
    fn test_undecodable_input() {
        assert!(matches!(
            assemble_pdf(&[b"not an image".to_vec()]),
            Err(PdfError::Image(_))
        ));
    }
}
