//! Tag byte builders shared by the integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::time::Duration;

use tiger_formats::TagHash;
use tiger_formats::package::PackageBuilder;
use tiger_storage::{PackageStore, RetryPolicy, StoreConfig};

/// Serializes a tag header, placing array elements after it
#[derive(Default)]
pub struct TagWriter {
    head: Vec<u8>,
    arrays: Vec<(usize, Vec<u8>)>,
}

impl TagWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.head.push(value);
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.head.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.head.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i32(mut self, value: i32) -> Self {
        self.head.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u64(mut self, value: u64) -> Self {
        self.head.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn floats(mut self, values: &[f32]) -> Self {
        for value in values {
            self.head.extend_from_slice(&value.to_le_bytes());
        }
        self
    }

    pub fn tag(self, hash: TagHash) -> Self {
        self.u32(hash.0)
    }

    pub fn pad(mut self, count: usize) -> Self {
        self.head.resize(self.head.len() + count, 0);
        self
    }

    /// Array field whose elements are produced by `element`
    pub fn array<T>(mut self, items: &[T], element: impl Fn(Self, &T) -> Self) -> Self {
        let mut elements = Vec::new();
        for item in items {
            elements.extend(element(Self::new(), item).finish());
        }
        self.head
            .extend_from_slice(&(items.len() as u64).to_le_bytes());
        self.arrays.push((self.head.len(), elements));
        self.head.extend_from_slice(&0u64.to_le_bytes());
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = self.head;
        for (field, elements) in self.arrays {
            let relative = (out.len() - field) as u64;
            out[field..field + 8].copy_from_slice(&relative.to_le_bytes());
            out.extend(elements);
        }
        out
    }
}

pub fn entity(resources: &[(u32, TagHash)]) -> Vec<u8> {
    TagWriter::new()
        .u64(0x100)
        .array(resources, |w, &(type_tag, resource)| {
            w.u32(type_tag).tag(resource)
        })
        .finish()
}

pub fn model(materials: &[TagHash]) -> Vec<u8> {
    TagWriter::new()
        .u64(0x200)
        .floats(&[-1.0, -1.0, -1.0, 1.0])
        .floats(&[1.0, 1.0, 1.0, 1.0])
        .array(&[(0u32, 36u32, 0u8), (36, 12, 1)], |w, &(start, count, lod)| {
            w.tag(TagHash::NONE)
                .tag(TagHash::NONE)
                .u32(start)
                .u32(count)
                .u8(lod)
                .pad(3)
        })
        .array(materials, |w, &material| w.tag(material))
        .finish()
}

pub fn skeleton(bones: &[(&str, i32)]) -> Vec<u8> {
    TagWriter::new()
        .u64(0x300)
        .array(bones, |w, &(name, parent)| {
            w.u32(tiger_formats::StringHash::from_text(name).0)
                .i32(parent)
                .floats(&[0.0, 0.0, 0.0, 1.0])
                .floats(&[0.0, 1.0, 0.0])
                .floats(&[1.0])
        })
        .finish()
}

pub fn control_rig(skeleton: TagHash, controls: &[(&str, i32)]) -> Vec<u8> {
    TagWriter::new()
        .u64(0x400)
        .tag(skeleton)
        .pad(4)
        .array(controls, |w, &(name, bone)| {
            w.u32(tiger_formats::StringHash::from_text(name).0).i32(bone)
        })
        .finish()
}

pub fn material(vs: TagHash, ps: TagHash, ps_textures: &[(u32, TagHash)]) -> Vec<u8> {
    TagWriter::new()
        .u64(0x500)
        .u32(0x11)
        .tag(vs)
        .tag(ps)
        .pad(4)
        .array(&[] as &[(u32, TagHash)], |w, _| w)
        .array(ps_textures, |w, &(slot, texture)| w.u32(slot).tag(texture))
        .finish()
}

pub fn texture(width: u16, height: u16) -> Vec<u8> {
    TagWriter::new()
        .u32(u32::from(width) * u32::from(height) * 4)
        .u16(28)
        .pad(2)
        .u16(width)
        .u16(height)
        .u16(1)
        .u16(1)
        .tag(TagHash::NONE)
        .finish()
}

pub fn write(dir: &Path, name: &str, builder: &PackageBuilder) {
    std::fs::write(dir.join(name), builder.build().unwrap()).unwrap();
}

pub async fn open(dir: &Path) -> PackageStore {
    let config = StoreConfig::new(dir).with_retry_policy(
        RetryPolicy::default().with_initial_backoff(Duration::from_millis(1)),
    );
    PackageStore::open(config).await.unwrap()
}
