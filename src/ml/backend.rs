// ============================================================
// Layer 5 — Compute Backend Selection
// ============================================================
// Where the tensors live is decided once, at startup, by
// picking a ComputeBackend type:
//
//   CpuBackend → Autodiff<NdArray>   always available
//   GpuBackend → Autodiff<Wgpu>      `wgpu` feature (default)
//
// When no --backend is given, the CLI asks is_available() once
// and falls back to the CPU if no GPU adapter answers.
//
// Everything downstream (PoemGenerator, trainer, checkpoint
// loading) is generic over this trait, so the device is fixed
// for the generator's whole lifetime.
//
// Training runs on the autodiff backend; evaluation and
// generation use `model.valid()`, which lands on the inner
// (non-autodiff) backend with dropout disabled.

use burn::tensor::backend::{AutodiffBackend, Backend};

/// Device handle of a ComputeBackend.
pub type ComputeDevice<C> = <<C as ComputeBackend>::Train as Backend>::Device;

pub trait ComputeBackend: Send + Sync + 'static {
    type Train: AutodiffBackend;

    fn device() -> ComputeDevice<Self>;

    fn name() -> &'static str;

    /// Whether `device()` can actually run kernels on this host.
    fn is_available() -> bool;
}

/// NdArray on the host CPU.
pub struct CpuBackend;

impl ComputeBackend for CpuBackend {
    type Train = burn::backend::Autodiff<burn::backend::NdArray>;

    fn device() -> ComputeDevice<Self> {
        burn::backend::ndarray::NdArrayDevice::Cpu
    }

    fn name() -> &'static str {
        "cpu (ndarray)"
    }

    fn is_available() -> bool {
        true
    }
}

/// First adapter WGPU finds (Vulkan / Metal / DX12).
#[cfg(feature = "wgpu")]
pub struct GpuBackend;

#[cfg(feature = "wgpu")]
impl ComputeBackend for GpuBackend {
    type Train = burn::backend::Autodiff<burn::backend::Wgpu>;

    fn device() -> ComputeDevice<Self> {
        burn::backend::wgpu::WgpuDevice::default()
    }

    fn name() -> &'static str {
        "gpu (wgpu)"
    }

    /// Round-trips a one-element tensor through the default adapter.
    /// WGPU panics while initialising when no adapter exists, so the
    /// check runs under catch_unwind with the panic message silenced.
    fn is_available() -> bool {
        use burn::tensor::Tensor;

        let hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));
        let round_trip = std::panic::catch_unwind(|| {
            let device = Self::device();
            Tensor::<burn::backend::Wgpu, 1>::zeros([1], &device).into_data()
        });
        std::panic::set_hook(hook);

        if round_trip.is_err() {
            tracing::debug!("No WGPU adapter answered the availability check");
        }
        round_trip.is_ok()
    }
}
