#![no_main]

use libfuzzer_sys::fuzz_target;
use stylemix_spec::{canonical_params_hash, validate_job, JobSpec};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(job) = JobSpec::from_json(text) else {
        return;
    };

    // Validation must never panic, whatever the document holds.
    validate_job(&job);
    let _ = canonical_params_hash(&job.params);

    // Documents that parsed keep their identity through a serialize/parse cycle.
    if let Ok(json) = job.to_json_pretty() {
        if let Ok(reparsed) = JobSpec::from_json(&json) {
            assert_eq!(reparsed.job_id, job.job_id);
            assert_eq!(reparsed.mode, job.mode);
        }
    }
});
