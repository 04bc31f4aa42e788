use sysinfo::System;

/// Liveness check
pub async fn ok_handler() -> &'static str {
    "OK!\n"
}

pub async fn version_handler() -> String {
    format!("API v{}\n", env!("CARGO_PKG_VERSION"))
}

/// Host CPU details as plain text
pub async fn cpu_handler() -> String {
    cpu_report()
}

fn cpu_report() -> String {
    let mut system = System::new();
    system.refresh_cpu_all();

    let mut report = format!(
        "OS: {}\nArch: {}\nNumber of cores: {}\n",
        std::env::consts::OS,
        std::env::consts::ARCH,
        system.cpus().len()
    );

    if let Some(cpu) = system.cpus().first() {
        report.push_str(&format!(
            "VendorID: {}\nModel Name: {}\nSpeed: {:.2} MHz\n",
            cpu.vendor_id(),
            cpu.brand(),
            cpu.frequency() as f64
        ));
    }

    report
}
