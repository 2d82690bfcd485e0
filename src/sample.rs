//! Sample catalog for trying the tool without a CMS export

use anyhow::Result;
use rusqlite::Connection;

use crate::db;
use crate::models::{Category, Component, FormFactor, Specs};

fn part(
    id: &str,
    name: &str,
    category: Category,
    dollars: i64,
    stock: u32,
    specs: Specs,
) -> Component {
    Component::new(id, name, category)
        .with_price(dollars * 100)
        .with_stock(stock)
        .with_specs(specs)
}

pub fn sample_catalog() -> Vec<Component> {
    vec![
        // Cases
        part("h5-flow", "NZXT H5 Flow", Category::Case, 95, 8, Specs {
            max_form_factor: Some(FormFactor::Atx),
            max_gpu_length_mm: Some(365.0),
            max_cooler_height_mm: Some(165.0),
            ..Default::default()
        }),
        part("a4-h2o", "Dan A4-H2O", Category::Case, 150, 2, Specs {
            max_form_factor: Some(FormFactor::MiniItx),
            max_gpu_length_mm: Some(322.0),
            max_cooler_height_mm: Some(55.0),
            ..Default::default()
        }),
        // Motherboards
        part("b650-tomahawk", "MSI MAG B650 Tomahawk", Category::Motherboard, 220, 5, Specs {
            socket: Some("AM5".into()),
            memory_type: Some("DDR5".into()),
            form_factor: Some(FormFactor::Atx),
            pcie_gen: Some(4),
            power_draw_watts: Some(50.0),
            ..Default::default()
        }),
        part("z790-itx", "ASUS ROG Strix Z790-I", Category::Motherboard, 350, 3, Specs {
            socket: Some("LGA1700".into()),
            memory_type: Some("DDR5".into()),
            form_factor: Some(FormFactor::MiniItx),
            pcie_gen: Some(5),
            power_draw_watts: Some(45.0),
            ..Default::default()
        }),
        // CPUs
        part("r5-7600", "AMD Ryzen 5 7600", Category::Cpu, 199, 12, Specs {
            socket: Some("AM5".into()),
            cores: Some(6),
            power_draw_watts: Some(65.0),
            ..Default::default()
        }),
        part("r9-7950x", "AMD Ryzen 9 7950X", Category::Cpu, 549, 4, Specs {
            socket: Some("AM5".into()),
            cores: Some(16),
            power_draw_watts: Some(170.0),
            ..Default::default()
        }),
        part("i7-14700k", "Intel Core i7-14700K", Category::Cpu, 399, 6, Specs {
            socket: Some("LGA1700".into()),
            cores: Some(20),
            power_draw_watts: Some(253.0),
            ..Default::default()
        }),
        // GPUs
        part("rtx-4060", "GeForce RTX 4060", Category::Gpu, 299, 10, Specs {
            vram_gb: Some(8.0),
            power_draw_watts: Some(115.0),
            length_mm: Some(240.0),
            pcie_gen: Some(4),
            ..Default::default()
        }),
        part("rx-7800xt", "Radeon RX 7800 XT", Category::Gpu, 499, 5, Specs {
            vram_gb: Some(16.0),
            power_draw_watts: Some(263.0),
            length_mm: Some(267.0),
            pcie_gen: Some(4),
            ..Default::default()
        }),
        part("rtx-4090", "GeForce RTX 4090", Category::Gpu, 1799, 1, Specs {
            vram_gb: Some(24.0),
            power_draw_watts: Some(450.0),
            length_mm: Some(336.0),
            pcie_gen: Some(4),
            ..Default::default()
        }),
        // Memory
        part("ddr5-32", "32GB (2x16GB) DDR5-6000", Category::Ram, 110, 20, Specs {
            memory_type: Some("DDR5".into()),
            capacity_gb: Some(32.0),
            modules: Some(2),
            power_draw_watts: Some(10.0),
            ..Default::default()
        }),
        part("ddr5-64", "64GB (2x32GB) DDR5-5600", Category::Ram, 190, 8, Specs {
            memory_type: Some("DDR5".into()),
            capacity_gb: Some(64.0),
            modules: Some(2),
            power_draw_watts: Some(12.0),
            ..Default::default()
        }),
        part("ddr4-16", "16GB (1x16GB) DDR4-3200", Category::Ram, 40, 15, Specs {
            memory_type: Some("DDR4".into()),
            capacity_gb: Some(16.0),
            modules: Some(1),
            power_draw_watts: Some(5.0),
            ..Default::default()
        }),
        // Storage
        part("sn850x-2tb", "WD Black SN850X 2TB", Category::Storage, 150, 9, Specs {
            capacity_gb: Some(2048.0),
            power_draw_watts: Some(8.0),
            ..Default::default()
        }),
        // Power supplies
        part("rm650", "Corsair RM650", Category::Psu, 90, 7, Specs {
            wattage: Some(650.0),
            ..Default::default()
        }),
        part("rm1000x", "Corsair RM1000x", Category::Psu, 190, 3, Specs {
            wattage: Some(1000.0),
            ..Default::default()
        }),
        // Cooling
        part("nh-d15", "Noctua NH-D15", Category::Cooling, 110, 6, Specs {
            height_mm: Some(165.0),
            power_draw_watts: Some(5.0),
            ..Default::default()
        }),
        part("nh-l9a", "Noctua NH-L9a", Category::Cooling, 45, 10, Specs {
            height_mm: Some(37.0),
            power_draw_watts: Some(3.0),
            ..Default::default()
        }),
    ]
}

/// Replace the catalog with the sample components
pub fn load_sample_data(conn: &Connection) -> Result<usize> {
    db::clear_catalog(conn)?;
    let catalog = sample_catalog();
    for component in &catalog {
        db::upsert_component(conn, component)?;
    }
    Ok(catalog.len())
}
