use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use memory_tree::binding::{Binding, BindingOptions};
use memory_tree::core::types::{Address, MemoryValue, PrimitiveKind, ValueKind};
use memory_tree::memory::{BufferMemory, Protection};
use memory_tree::schema::{Schema, SchemaRegistry};

const BASE: Address = Address::new(0x10_0000);

/// A world holding `count` entities inline and a linked list through them
fn world(count: usize) -> (SchemaRegistry, BufferMemory) {
    let registry = SchemaRegistry::new()
        .with(
            Schema::new("Vec3", 12)
                .field("x", ValueKind::primitive(PrimitiveKind::F32), 0, 4)
                .field("y", ValueKind::primitive(PrimitiveKind::F32), 4, 4)
                .field("z", ValueKind::primitive(PrimitiveKind::F32), 8, 4),
        )
        .with(
            Schema::new("Entity", 32)
                .field("pos", ValueKind::nested("Vec3"), 0, 12)
                .field("hp", ValueKind::primitive(PrimitiveKind::I32), 12, 4)
                .field("flags", ValueKind::bitfield(4, 0, 3), 16, 4)
                .field("next", ValueKind::pointer_to("Entity"), 24, 8),
        )
        .with(
            Schema::new("World", 32 * count + 8)
                .field("entities", ValueKind::array(ValueKind::nested("Entity"), count), 0, 32 * count)
                .field("ticks", ValueKind::primitive(PrimitiveKind::U64), 32 * count, 8),
        );

    let mut bytes = vec![0u8; 32 * count + 8];
    for i in 0..count {
        let entity = &mut bytes[i * 32..(i + 1) * 32];
        entity[12..16].copy_from_slice(&(i as i32).to_le_bytes());
        if i + 1 < count {
            let next = BASE.as_u64() + ((i + 1) * 32) as u64;
            entity[24..32].copy_from_slice(&next.to_le_bytes());
        }
    }
    let memory = BufferMemory::new();
    memory.map(BASE, bytes, Protection::read_write());
    (registry, memory)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for count in [8, 64] {
        let (registry, memory) = world(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let binding =
                    Binding::open(&registry, "World", BASE, &memory, BindingOptions::default())
                        .unwrap();
                black_box(binding.tree().len())
            });
        });
    }
    group.finish();
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for count in [8, 64] {
        let (registry, memory) = world(count);
        let mut binding =
            Binding::open(&registry, "World", BASE, &memory, BindingOptions::default()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(binding.tick()));
        });
    }
    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let (registry, memory) = world(8);
    let mut binding =
        Binding::open(&registry, "World", BASE, &memory, BindingOptions::default()).unwrap();
    let hp = binding.find("entities[3].hp").unwrap();

    c.bench_function("write_verified", |b| {
        let mut value = 0i32;
        b.iter(|| {
            value = value.wrapping_add(1);
            binding.write_value(hp, MemoryValue::I32(value)).unwrap();
        });
    });
}

criterion_group!(benches, bench_build, bench_tick, bench_write);
criterion_main!(benches);
