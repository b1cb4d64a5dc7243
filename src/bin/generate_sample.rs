use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }
}

/// (item, active ingredient, class, subclass, list price)
const ITEMS: [(&str, &str, &str, &str, f64); 6] = [
    ("PARACETAMOL 500 MG TABLET", "Paracetamol 500 mg", "Analgesik", "Non-opioid", 600.0),
    ("AMOXICILLIN 500 MG KAPSUL", "Amoxicillin 500 mg", "Antibiotik", "Penisilin", 1500.0),
    ("CETIRIZINE 10 MG TABLET", "Cetirizine 10 mg", "Antihistamin", "Generasi 2", 900.0),
    ("OMEPRAZOLE 20 MG KAPSUL", "Omeprazole 20 mg", "Saluran Cerna", "PPI", 2500.0),
    ("RINGER LAKTAT INFUS 500 ML", "Natrium laktat", "Cairan", "Elektrolit", 18000.0),
    ("AMBROXOL SIRUP 60 ML", "Ambroxol 15 mg/5 ml", "Mukolitik", "Ekspektoran", 22000.0),
];

struct Line {
    provider: String,
    place: String,
    doctor: String,
    diagnosis: String,
    product: String,
    item: usize,
    qty: f64,
    price: f64,
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let providers = ["Mitra Keluarga", "Hermina", "Siloam"];
    let places = ["Bekasi", "Depok", "Bogor", "Jakarta Timur"];
    let doctors = ["dr. Ani", "dr. Budi", "dr. Citra", "dr. Dewi", ""];
    let diagnoses = ["J06.9 ISPA", "K30 Dispepsia", "A09 Diare", "R50.9 Demam"];
    let products = ["Obat", "Alkes"];

    let lines: Vec<Line> = (0..500)
        .map(|_| {
            let item = rng.below(ITEMS.len());
            // Mostly list price, sometimes a provider markup or a free line.
            let price = match rng.below(10) {
                0 => 0.0,
                1 | 2 => ITEMS[item].4 * 1.25,
                _ => ITEMS[item].4,
            };
            Line {
                provider: rng.pick(&providers).to_string(),
                place: rng.pick(&places).to_string(),
                doctor: rng.pick(&doctors).to_string(),
                diagnosis: rng.pick(&diagnoses).to_string(),
                product: rng.pick(&products).to_string(),
                item,
                qty: (1 + rng.below(20)) as f64,
                price,
            }
        })
        .collect();

    write_csv("sample_billing.csv", &lines)?;
    write_parquet("sample_billing.parquet", &lines)?;

    println!(
        "Wrote {} billing lines to sample_billing.csv and sample_billing.parquet",
        lines.len()
    );
    Ok(())
}

const HEADERS: [&str; 12] = [
    "GroupProvider",
    "TreatmentPlace",
    "DoctorName",
    "PrimaryDiagnosis",
    "ProductType",
    "Nama Item Garda Medika",
    "Komposisi Zat Aktif",
    "Golongan",
    "Subgolongan",
    "Qty",
    "Amount Bill",
    "Harga Satuan",
];

fn write_csv(path: &str, lines: &[Line]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV output")?;
    writer.write_record(HEADERS)?;
    for l in lines {
        let (item, ingredient, class, subclass, _) = ITEMS[l.item];
        writer.write_record([
            l.provider.as_str(),
            l.place.as_str(),
            l.doctor.as_str(),
            l.diagnosis.as_str(),
            l.product.as_str(),
            item,
            ingredient,
            class,
            subclass,
            l.qty.to_string().as_str(),
            (l.qty * l.price).to_string().as_str(),
            l.price.to_string().as_str(),
        ])?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(())
}

fn write_parquet(path: &str, lines: &[Line]) -> Result<()> {
    let text = |f: &dyn Fn(&Line) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(lines.iter().map(f).collect::<Vec<_>>()))
    };
    let number = |f: &dyn Fn(&Line) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(lines.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(
        HEADERS
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let ty = if i >= 9 { DataType::Float64 } else { DataType::Utf8 };
                Field::new(*name, ty, false)
            })
            .collect::<Vec<_>>(),
    ));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            text(&|l| l.provider.as_str()),
            text(&|l| l.place.as_str()),
            text(&|l| l.doctor.as_str()),
            text(&|l| l.diagnosis.as_str()),
            text(&|l| l.product.as_str()),
            text(&|l| ITEMS[l.item].0),
            text(&|l| ITEMS[l.item].1),
            text(&|l| ITEMS[l.item].2),
            text(&|l| ITEMS[l.item].3),
            number(&|l| l.qty),
            number(&|l| l.qty * l.price),
            number(&|l| l.price),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
